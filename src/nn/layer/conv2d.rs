/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Conv2d层：卷积核（+可选偏置）参数与前向接线
 */

use crate::nn::graph::{Graph, GraphError};
use crate::nn::module::Module;
use crate::nn::var::{Init, Var};
use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// 2D卷积层
///
/// 可训练版本的卷积核是Parameter节点（Kaiming初始化）；
/// 冻结版本（[`Conv2d::new_frozen`]）的卷积核是Input常量节点，
/// 反向传播不会给它计算梯度，也不会被优化器更新。
pub struct Conv2d {
    name: String,
    kernel: Var,
    bias: Option<Var>,
    stride: (usize, usize),
    padding: (usize, usize),
    trainable: bool,
}

impl Conv2d {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &Graph,
        name: &str,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        with_bias: bool,
        rng: &mut StdRng,
    ) -> Result<Self, GraphError> {
        let kernel_shape = [out_channels, in_channels, kernel_size.0, kernel_size.1];
        let kernel = Var::parameter(
            graph,
            Init::Kaiming.generate(&kernel_shape, rng),
            &format!("{name}_kernel"),
        )?;
        let bias = if with_bias {
            Some(Var::parameter(
                graph,
                Tensor::zeros(&[1, out_channels]),
                &format!("{name}_bias"),
            )?)
        } else {
            None
        };
        Ok(Self {
            name: name.to_string(),
            kernel,
            bias,
            stride,
            padding,
            trainable: true,
        })
    }

    /// 冻结卷积层：权重由种子确定性生成，作为Input常量挂在图上
    #[allow(clippy::too_many_arguments)]
    pub fn new_frozen(
        graph: &Graph,
        name: &str,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        seed: u64,
    ) -> Result<Self, GraphError> {
        let kernel_shape = [out_channels, in_channels, kernel_size.0, kernel_size.1];
        let fan_in = (in_channels * kernel_size.0 * kernel_size.1).max(1);
        let std = (2.0 / fan_in as f32).sqrt();
        let kernel_value = Tensor::new_normal_seeded(0.0, std, &kernel_shape, seed);
        let kernel = Var::constant(graph, &kernel_value, &format!("{name}_kernel"))?;
        Ok(Self {
            name: name.to_string(),
            kernel,
            bias: None,
            stride,
            padding,
            trainable: false,
        })
    }

    /// 冻结卷积层，权重来自外部给定的张量（从文件加载的预训练权重）
    pub fn new_frozen_with_weights(
        graph: &Graph,
        name: &str,
        kernel_value: &Tensor,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self, GraphError> {
        if kernel_value.dimension() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: kernel_value.dimension(),
                message: "卷积核必须是4D [C_out, C_in, kH, kW]".to_string(),
            });
        }
        let kernel = Var::constant(graph, kernel_value, &format!("{name}_kernel"))?;
        Ok(Self {
            name: name.to_string(),
            kernel,
            bias: None,
            stride,
            padding,
            trainable: false,
        })
    }

    /// 卷积核节点（冻结层的核是Input常量，不在parameters()中）
    pub fn kernel(&self) -> &Var {
        &self.kernel
    }

    pub fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let conv_id = x.graph().new_conv2d(
            x.node_id(),
            self.kernel.node_id(),
            self.stride,
            self.padding,
            Some(&format!("{}_conv", self.name)),
        )?;
        let conv = Var::from_node(x.graph().clone(), conv_id);
        match &self.bias {
            Some(bias) => {
                let biased_id = x.graph().new_channel_bias_add(
                    conv.node_id(),
                    bias.node_id(),
                    Some(&format!("{}_biased", self.name)),
                )?;
                Ok(Var::from_node(x.graph().clone(), biased_id))
            }
            None => Ok(conv),
        }
    }
}

impl Module for Conv2d {
    fn parameters(&self) -> Vec<Var> {
        if !self.trainable {
            return Vec::new();
        }
        let mut params = vec![self.kernel.clone()];
        if let Some(bias) = &self.bias {
            params.push(bias.clone());
        }
        params
    }
}
