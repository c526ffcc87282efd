use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 纯数缩放节点：`value = factor * parents[0]`
///
/// 用于复合损失中的权重项（如`w1 * L1`），比引入常量节点再逐元素相乘更轻。
#[derive(Clone)]
pub(crate) struct ScalarMultiply {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    factor: f32,
}

impl ScalarMultiply {
    pub(crate) fn new(parents: &[&NodeHandle], factor: f32) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "ScalarMultiply节点需要1个父节点".to_string(),
            ));
        }
        if !factor.is_finite() {
            return Err(GraphError::InvalidOperation(format!(
                "ScalarMultiply的缩放系数必须是有限值，得到{factor}"
            )));
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            factor,
        })
    }
}

impl TraitNode for ScalarMultiply {
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
        let a = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        self.value = Some(a * self.factor);
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
        Ok(upstream_grad * self.factor)
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
