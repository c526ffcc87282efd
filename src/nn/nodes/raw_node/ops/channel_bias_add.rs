use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 通道偏置加法节点：`value[b, c, h, w] = input[b, c, h, w] + bias[0, c]`
///
/// 父节点：
/// - parents[0]: 输入 [batch, C, H, W]
/// - parents[1]: 偏置 [1, C]
#[derive(Clone)]
pub(crate) struct ChannelBiasAdd {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parents_ids: Vec<NodeId>,
}

impl ChannelBiasAdd {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "ChannelBiasAdd节点需要2个父节点：[输入, 偏置]".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        let bias_shape = parents[1].value_expected_shape();
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: "ChannelBiasAdd的输入必须是4D [batch, C, H, W]".to_string(),
            });
        }
        if bias_shape != [1, input_shape[1]] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1, input_shape[1]],
                got: bias_shape.to_vec(),
                message: "偏置形状必须是[1, C]且C与输入通道数一致".to_string(),
            });
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: input_shape.to_vec(),
            parents_ids: vec![parents[0].id(), parents[1].id()],
        })
    }
}

impl TraitNode for ChannelBiasAdd {
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
        let input = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的输入父节点没有值", self.display_node()))
        })?;
        let bias = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的偏置父节点没有值", self.display_node()))
        })?;

        let shape = input.shape();
        let (batch, c, h, w) = (shape[0], shape[1], shape[2], shape[3]);
        let mut out = input.clone();
        for bi in 0..batch {
            for ci in 0..c {
                let b_val = bias[[0, ci]];
                for hi in 0..h {
                    for wi in 0..w {
                        out[[bi, ci, hi, wi]] += b_val;
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
        if target_parent.id() == self.parents_ids[0] {
            // 对输入的梯度：原样传递
            Ok(upstream_grad.clone())
        } else {
            // 对偏置的梯度：在batch与空间维上求和
            let shape = upstream_grad.shape();
            let (batch, c, h, w) = (shape[0], shape[1], shape[2], shape[3]);
            let mut bias_grad = Tensor::zeros(&[1, c]);
            for bi in 0..batch {
                for ci in 0..c {
                    let mut sum = 0.0;
                    for hi in 0..h {
                        for wi in 0..w {
                            sum += upstream_grad[[bi, ci, hi, wi]];
                        }
                    }
                    bias_grad[[0, ci]] += sum;
                }
            }
            Ok(bias_grad)
        }
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
