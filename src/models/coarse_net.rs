use super::{LEAKY_SLOPE, validate_input_channels};
use crate::nn::{Conv2d, Forward, Graph, GraphError, Module, Var, VarActivationOps, VarStyleOps};
use rand::rngs::StdRng;

/// CoarseNet：3通道含网点图像 → 3通道粗糙重建
///
/// 结构：两级stride-2下采样 → 残差中段 → 两级最近邻上采样+卷积 → 线性输出。
/// 输出空间尺寸与输入一致（要求输入的H、W都能被4整除）。
pub struct CoarseNet {
    down1: Conv2d,
    down2: Conv2d,
    mid1: Conv2d,
    mid2: Conv2d,
    up1: Conv2d,
    up2: Conv2d,
    out: Conv2d,
}

impl CoarseNet {
    pub const IN_CHANNELS: usize = 3;
    pub const OUT_CHANNELS: usize = 3;

    pub fn new(graph: &Graph, base_channels: usize, rng: &mut StdRng) -> Result<Self, GraphError> {
        let c = base_channels;
        Ok(Self {
            down1: Conv2d::new(graph, "coarse_down1", 3, c, (3, 3), (2, 2), (1, 1), true, rng)?,
            down2: Conv2d::new(graph, "coarse_down2", c, 2 * c, (3, 3), (2, 2), (1, 1), true, rng)?,
            mid1: Conv2d::new(graph, "coarse_mid1", 2 * c, 2 * c, (3, 3), (1, 1), (1, 1), true, rng)?,
            mid2: Conv2d::new(graph, "coarse_mid2", 2 * c, 2 * c, (3, 3), (1, 1), (1, 1), true, rng)?,
            up1: Conv2d::new(graph, "coarse_up1", 2 * c, c, (3, 3), (1, 1), (1, 1), true, rng)?,
            up2: Conv2d::new(graph, "coarse_up2", c, c, (3, 3), (1, 1), (1, 1), true, rng)?,
            out: Conv2d::new(graph, "coarse_out", c, 3, (3, 3), (1, 1), (1, 1), true, rng)?,
        })
    }
}

impl Forward for CoarseNet {
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        validate_input_channels(x, Self::IN_CHANNELS, "CoarseNet")?;
        let shape = x.shape()?;
        if shape[2] % 4 != 0 || shape[3] % 4 != 0 {
            return Err(GraphError::InvalidOperation(format!(
                "CoarseNet的输入空间尺寸必须能被4整除，得到{shape:?}"
            )));
        }

        let d1 = self.down1.forward(x)?.leaky_relu(LEAKY_SLOPE)?;
        let d2 = self.down2.forward(&d1)?.leaky_relu(LEAKY_SLOPE)?;

        let m1 = self.mid1.forward(&d2)?.leaky_relu(LEAKY_SLOPE)?;
        let m2 = self.mid2.forward(&m1)?;
        let mid = m2.try_add(&d2, None)?;

        let u1 = self
            .up1
            .forward(&mid.upsample_nearest(2)?)?
            .leaky_relu(LEAKY_SLOPE)?;
        let u2 = self
            .up2
            .forward(&u1.upsample_nearest(2)?)?
            .leaky_relu(LEAKY_SLOPE)?;

        self.out.forward(&u2)
    }
}

impl Module for CoarseNet {
    fn parameters(&self) -> Vec<Var> {
        [
            &self.down1, &self.down2, &self.mid1, &self.mid2, &self.up1, &self.up2, &self.out,
        ]
        .iter()
        .flat_map(|layer| layer.parameters())
        .collect()
    }
}
