use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 逐像素通道Softmax节点
///
/// 对[batch, C, H, W]的每个空间位置在通道维上做softmax，
/// 输出逐像素的类别概率（分割模块的解码输出）。
///
/// 反向传播（对每个像素位置的通道向量y、上游梯度g）：
/// `dL/dx_c = y_c * (g_c - Σ_k g_k * y_k)`
#[derive(Clone)]
pub(crate) struct ChannelSoftmax {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl ChannelSoftmax {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "ChannelSoftmax节点需要1个父节点".to_string(),
            ));
        }
        let shape = parents[0].value_expected_shape();
        if shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: shape.len(),
                message: "ChannelSoftmax的输入必须是4D [batch, C, H, W]".to_string(),
            });
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for ChannelSoftmax {
    fn id(&self) -> NodeId {
        self.id.unwrap()
    }

    fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<未命名>")
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let x = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        let shape = x.shape();
        let (batch, c, h, w) = (shape[0], shape[1], shape[2], shape[3]);
        let mut out = Tensor::zeros(shape);
        for bi in 0..batch {
            for hi in 0..h {
                for wi in 0..w {
                    // 数值稳定：先减去通道最大值
                    let mut max = f32::NEG_INFINITY;
                    for ci in 0..c {
                        max = max.max(x[[bi, ci, hi, wi]]);
                    }
                    let mut sum = 0.0;
                    for ci in 0..c {
                        let e = (x[[bi, ci, hi, wi]] - max).exp();
                        out[[bi, ci, hi, wi]] = e;
                        sum += e;
                    }
                    for ci in 0..c {
                        out[[bi, ci, hi, wi]] /= sum;
                    }
                }
            }
        }
        self.value = Some(out);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.value = value.cloned();
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let y = self.value.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!("{}没有值，需先执行前向传播", self.display_node()))
        })?;
        let shape = y.shape();
        let (batch, c, h, w) = (shape[0], shape[1], shape[2], shape[3]);
        let mut grad = Tensor::zeros(shape);
        for bi in 0..batch {
            for hi in 0..h {
                for wi in 0..w {
                    let mut dot = 0.0;
                    for ci in 0..c {
                        dot += upstream_grad[[bi, ci, hi, wi]] * y[[bi, ci, hi, wi]];
                    }
                    for ci in 0..c {
                        grad[[bi, ci, hi, wi]] =
                            y[[bi, ci, hi, wi]] * (upstream_grad[[bi, ci, hi, wi]] - dot);
                    }
                }
            }
        }
        Ok(grad)
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }

    fn clear_value(&mut self) {
        self.value = None;
    }
}
