use super::{LEAKY_SLOPE, validate_input_channels};
use crate::nn::{Conv2d, Forward, Graph, GraphError, Module, Var, VarActivationOps};
use rand::rngs::StdRng;

/// DetailsNet：32通道HACE融合输入 → 3通道细节残差（tanh输出）
///
/// 残差会在训练会话中与粗糙重建相加得到最终重建。
pub struct DetailsNet {
    body: Vec<Conv2d>,
    head: Conv2d,
}

impl DetailsNet {
    /// HACE拼接的通道数：x(3) + coarse(3) + seg(25) + edge(1)
    pub const IN_CHANNELS: usize = 32;
    pub const OUT_CHANNELS: usize = 3;

    pub fn new(graph: &Graph, base_channels: usize, rng: &mut StdRng) -> Result<Self, GraphError> {
        let c = base_channels;
        let channels = [
            (Self::IN_CHANNELS, c),
            (c, 2 * c),
            (2 * c, 2 * c),
            (2 * c, c),
        ];
        let mut body = Vec::with_capacity(channels.len());
        for (i, (cin, cout)) in channels.into_iter().enumerate() {
            body.push(Conv2d::new(
                graph,
                &format!("details_body{}", i + 1),
                cin,
                cout,
                (3, 3),
                (1, 1),
                (1, 1),
                true,
                rng,
            )?);
        }
        let head = Conv2d::new(graph, "details_head", c, 3, (3, 3), (1, 1), (1, 1), true, rng)?;
        Ok(Self { body, head })
    }
}

impl Forward for DetailsNet {
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        validate_input_channels(x, Self::IN_CHANNELS, "DetailsNet")?;
        let mut h = x.clone();
        for block in &self.body {
            h = block.forward(&h)?.leaky_relu(LEAKY_SLOPE)?;
        }
        self.head.forward(&h)?.tanh()
    }
}

impl Module for DetailsNet {
    fn parameters(&self) -> Vec<Var> {
        let mut params: Vec<Var> = self.body.iter().flat_map(Conv2d::parameters).collect();
        params.extend(self.head.parameters());
        params
    }
}
