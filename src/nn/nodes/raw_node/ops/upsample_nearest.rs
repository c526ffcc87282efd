use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 最近邻上采样节点：把[batch, C, H, W]放大为[batch, C, H*scale, W*scale]
///
/// 分割模块的decode用它把低分辨率类别图恢复到输入尺寸。
/// 反向传播：每个scale×scale块内的上游梯度求和，回流到对应的输入位置。
#[derive(Clone)]
pub(crate) struct UpsampleNearest {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    scale: usize,
}

impl UpsampleNearest {
    pub(crate) fn new(parents: &[&NodeHandle], scale: usize) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "UpsampleNearest节点需要1个父节点".to_string(),
            ));
        }
        if scale == 0 {
            return Err(GraphError::InvalidOperation(
                "上采样倍率必须大于0".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: "UpsampleNearest的输入必须是4D [batch, C, H, W]".to_string(),
            });
        }
        let shape = vec![
            input_shape[0],
            input_shape[1],
            input_shape[2] * scale,
            input_shape[3] * scale,
        ];
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape,
            scale,
        })
    }
}

impl TraitNode for UpsampleNearest {
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
        let in_shape = x.shape();
        let (batch, c, in_h, in_w) = (in_shape[0], in_shape[1], in_shape[2], in_shape[3]);
        let scale = self.scale;
        let mut out = Tensor::zeros(&self.shape);
        for bi in 0..batch {
            for ci in 0..c {
                for hi in 0..in_h {
                    for wi in 0..in_w {
                        let v = x[[bi, ci, hi, wi]];
                        for dh in 0..scale {
                            for dw in 0..scale {
                                out[[bi, ci, hi * scale + dh, wi * scale + dw]] = v;
                            }
                        }
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
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let in_shape = target_parent.value_expected_shape();
        let (batch, c, in_h, in_w) = (in_shape[0], in_shape[1], in_shape[2], in_shape[3]);
        let scale = self.scale;
        let mut grad = Tensor::zeros(in_shape);
        for bi in 0..batch {
            for ci in 0..c {
                for hi in 0..in_h {
                    for wi in 0..in_w {
                        let mut sum = 0.0;
                        for dh in 0..scale {
                            for dw in 0..scale {
                                sum += upstream_grad[[bi, ci, hi * scale + dh, wi * scale + dw]];
                            }
                        }
                        grad[[bi, ci, hi, wi]] = sum;
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
