use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 逐元素加法节点：`value = parents[0] + parents[1]`，两个父节点形状必须一致
#[derive(Clone)]
pub(crate) struct Add {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl Add {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "Add节点需要2个父节点".to_string(),
            ));
        }
        let a = parents[0].value_expected_shape();
        let b = parents[1].value_expected_shape();
        if a != b {
            return Err(GraphError::ShapeMismatch {
                expected: a.to_vec(),
                got: b.to_vec(),
                message: "Add的两个父节点形状必须一致".to_string(),
            });
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: a.to_vec(),
        })
    }
}

impl TraitNode for Add {
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
        let b = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[1]))
        })?;
        self.value = Some(a + b);
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
        Ok(upstream_grad.clone())
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
