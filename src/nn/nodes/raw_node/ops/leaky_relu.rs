use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// LeakyReLU激活节点：`y = x (x > 0)；y = alpha * x (x <= 0)`
#[derive(Clone)]
pub(crate) struct LeakyRelu {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    alpha: f32,
}

impl LeakyRelu {
    pub(crate) fn new(parents: &[&NodeHandle], alpha: f32) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "LeakyRelu节点需要1个父节点".to_string(),
            ));
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            alpha,
        })
    }
}

impl TraitNode for LeakyRelu {
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
        let alpha = self.alpha;
        self.value = Some(x.map(|v| if v > 0.0 { v } else { alpha * v }));
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
        parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let x = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        let alpha = self.alpha;
        let mask = x.map(|v| if v > 0.0 { 1.0 } else { alpha });
        Ok(upstream_grad * &mask)
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
