use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 通道维拼接节点（NCHW的第1维）
///
/// 接受N（>=2）个父节点，所有父节点的batch与空间尺寸必须一致，
/// 输出通道数为各父节点通道数之和。HACE/HOD的拼接即由本节点承载。
///
/// 反向传播：把上游梯度按各父节点的通道区间切片分发。
#[derive(Clone)]
pub(crate) struct Concat {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parents_ids: Vec<NodeId>,
    /// 各父节点在输出通道维上的起始偏移（最后一个元素是总通道数）
    channel_offsets: Vec<usize>,
}

impl Concat {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() < 2 {
            return Err(GraphError::InvalidOperation(
                "Concat节点至少需要2个父节点".to_string(),
            ));
        }

        let first = parents[0].value_expected_shape();
        if first.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: first.len(),
                message: "Concat的父节点必须是4D [batch, C, H, W]".to_string(),
            });
        }

        let (batch, h, w) = (first[0], first[2], first[3]);
        let mut channel_offsets = vec![0];
        let mut total_channels = 0;
        for parent in parents {
            let shape = parent.value_expected_shape();
            if shape.len() != 4 || shape[0] != batch || shape[2] != h || shape[3] != w {
                return Err(GraphError::ShapeMismatch {
                    expected: first.to_vec(),
                    got: shape.to_vec(),
                    message: format!(
                        "Concat的父节点{parent}与第一个父节点的batch/空间尺寸不一致"
                    ),
                });
            }
            total_channels += shape[1];
            channel_offsets.push(total_channels);
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![batch, total_channels, h, w],
            parents_ids: parents.iter().map(|p| p.id()).collect(),
            channel_offsets,
        })
    }
}

impl TraitNode for Concat {
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
        let mut values = Vec::with_capacity(parents.len());
        for parent in parents {
            values.push(parent.value().ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}的父节点{}没有值",
                    self.display_node(),
                    parent
                ))
            })?);
        }
        self.value = Some(Tensor::concat_channels(&values));
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
        let index = self
            .parents_ids
            .iter()
            .position(|&id| id == target_parent.id())
            .ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}不是{}的父节点",
                    target_parent,
                    self.display_node()
                ))
            })?;
        let start = self.channel_offsets[index];
        let end = self.channel_offsets[index + 1];
        Ok(upstream_grad.slice_channels(start, end))
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
