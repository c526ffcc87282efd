use super::{LEAKY_SLOPE, validate_input_channels};
use crate::nn::{Conv2d, Forward, Graph, GraphError, Module, Var, VarActivationOps};
use rand::rngs::StdRng;

/// EdgeNet：3通道图像 → 1通道sigmoid边缘图
///
/// 四个conv+leaky-relu块加sigmoid输出头，全部stride-1，空间尺寸不变。
/// 同一个EdgeNet实例会被接线两次：一次作用于原始输入，一次作用于细节重建。
pub struct EdgeNet {
    blocks: Vec<Conv2d>,
    head: Conv2d,
}

impl EdgeNet {
    pub const IN_CHANNELS: usize = 3;
    pub const OUT_CHANNELS: usize = 1;

    pub fn new(graph: &Graph, base_channels: usize, rng: &mut StdRng) -> Result<Self, GraphError> {
        let c = base_channels;
        let channels = [(3, c), (c, c), (c, c), (c, c)];
        let mut blocks = Vec::with_capacity(channels.len());
        for (i, (cin, cout)) in channels.into_iter().enumerate() {
            blocks.push(Conv2d::new(
                graph,
                &format!("edge_block{}", i + 1),
                cin,
                cout,
                (3, 3),
                (1, 1),
                (1, 1),
                true,
                rng,
            )?);
        }
        let head = Conv2d::new(graph, "edge_head", c, 1, (3, 3), (1, 1), (1, 1), true, rng)?;
        Ok(Self { blocks, head })
    }
}

impl Forward for EdgeNet {
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        validate_input_channels(x, Self::IN_CHANNELS, "EdgeNet")?;
        let mut h = x.clone();
        for block in &self.blocks {
            h = block.forward(&h)?.leaky_relu(LEAKY_SLOPE)?;
        }
        self.head.forward(&h)?.sigmoid()
    }
}

impl Module for EdgeNet {
    fn parameters(&self) -> Vec<Var> {
        let mut params: Vec<Var> = self.blocks.iter().flat_map(Conv2d::parameters).collect();
        params.extend(self.head.parameters());
        params
    }
}
