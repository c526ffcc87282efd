use super::{LEAKY_SLOPE, validate_input_channels};
use crate::nn::{Conv2d, Forward, Graph, GraphError, Module, Var, VarActivationOps};
use rand::rngs::StdRng;

/// PatchGAN主干：三级stride-2卷积 + sigmoid评分图头
///
/// 评分图的空间尺寸是输入的1/8，每个位置评判输入的一个局部patch。
/// sigmoid把评分压到(0, 1)，与MSE对全1/全0目标配合使用。
struct PatchGan {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    head: Conv2d,
    in_channels: usize,
    name: &'static str,
}

impl PatchGan {
    fn new(
        graph: &Graph,
        name: &'static str,
        in_channels: usize,
        base_channels: usize,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        let c = base_channels;
        Ok(Self {
            conv1: Conv2d::new(
                graph,
                &format!("{name}_conv1"),
                in_channels,
                c,
                (4, 4),
                (2, 2),
                (1, 1),
                true,
                rng,
            )?,
            conv2: Conv2d::new(
                graph,
                &format!("{name}_conv2"),
                c,
                2 * c,
                (4, 4),
                (2, 2),
                (1, 1),
                true,
                rng,
            )?,
            conv3: Conv2d::new(
                graph,
                &format!("{name}_conv3"),
                2 * c,
                4 * c,
                (4, 4),
                (2, 2),
                (1, 1),
                true,
                rng,
            )?,
            head: Conv2d::new(
                graph,
                &format!("{name}_head"),
                4 * c,
                1,
                (3, 3),
                (1, 1),
                (1, 1),
                true,
                rng,
            )?,
            in_channels,
            name,
        })
    }

    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        validate_input_channels(x, self.in_channels, self.name)?;
        let h1 = self.conv1.forward(x)?.leaky_relu(LEAKY_SLOPE)?;
        let h2 = self.conv2.forward(&h1)?.leaky_relu(LEAKY_SLOPE)?;
        let h3 = self.conv3.forward(&h2)?.leaky_relu(LEAKY_SLOPE)?;
        self.head.forward(&h3)?.sigmoid()
    }

    fn parameters(&self) -> Vec<Var> {
        [&self.conv1, &self.conv2, &self.conv3, &self.head]
            .iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }
}

/// 一号判别器：3通道，评判细节残差的真伪
pub struct DiscriminatorOne {
    gan: PatchGan,
}

impl DiscriminatorOne {
    pub const IN_CHANNELS: usize = 3;

    pub fn new(graph: &Graph, base_channels: usize, rng: &mut StdRng) -> Result<Self, GraphError> {
        Ok(Self {
            gan: PatchGan::new(graph, "disc_one", Self::IN_CHANNELS, base_channels, rng)?,
        })
    }
}

impl Forward for DiscriminatorOne {
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        self.gan.forward(x)
    }
}

impl Module for DiscriminatorOne {
    fn parameters(&self) -> Vec<Var> {
        self.gan.parameters()
    }
}

/// 二号判别器：9通道，评判HOD拼接{x, y_descreen, details}的真伪
pub struct DiscriminatorTwo {
    gan: PatchGan,
}

impl DiscriminatorTwo {
    pub const IN_CHANNELS: usize = 9;

    pub fn new(graph: &Graph, base_channels: usize, rng: &mut StdRng) -> Result<Self, GraphError> {
        Ok(Self {
            gan: PatchGan::new(graph, "disc_two", Self::IN_CHANNELS, base_channels, rng)?,
        })
    }
}

impl Forward for DiscriminatorTwo {
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        self.gan.forward(x)
    }
}

impl Module for DiscriminatorTwo {
    fn parameters(&self) -> Vec<Var> {
        self.gan.parameters()
    }
}
