use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// L1损失节点：`value = mean(|prediction - target|)`，输出[1, 1]
///
/// 父节点：
/// - parents[0]: 预测
/// - parents[1]: 目标
///
/// 损失节点可能位于加权求和之下（如粗糙损失的w1·L1 + w2·风格项），
/// 因此反向传播时要乘上上游传来的标量梯度。
#[derive(Clone)]
pub(crate) struct L1Loss {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parents_ids: Vec<NodeId>,
    /// 前向时缓存的 prediction - target
    diff: Option<Tensor>,
}

impl L1Loss {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "L1Loss节点需要2个父节点：[预测, 目标]".to_string(),
            ));
        }
        let pred_shape = parents[0].value_expected_shape();
        let target_shape = parents[1].value_expected_shape();
        if pred_shape != target_shape {
            return Err(GraphError::ShapeMismatch {
                expected: pred_shape.to_vec(),
                got: target_shape.to_vec(),
                message: "L1Loss的预测与目标形状必须一致".to_string(),
            });
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![1, 1],
            parents_ids: vec![parents[0].id(), parents[1].id()],
            diff: None,
        })
    }
}

impl TraitNode for L1Loss {
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
        let prediction = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的预测父节点没有值", self.display_node()))
        })?;
        let target = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的目标父节点没有值", self.display_node()))
        })?;

        let diff = prediction - target;
        let loss = diff.abs().mean_all();
        self.value = Some(Tensor::new(&[loss], &[1, 1]));
        self.diff = Some(diff);
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
        let scale = upstream_grad.number().ok_or_else(|| {
            GraphError::ComputationError("损失节点的上游梯度必须是标量".to_string())
        })?;
        let diff = self.diff.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!("{}没有缓存差值，需先执行前向传播", self.display_node()))
        })?;

        let numel = diff.size() as f32;
        let grad = &diff.signum() * (scale / numel);
        if target_parent.id() == self.parents_ids[0] {
            Ok(grad)
        } else {
            Ok(-&grad)
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
        self.diff = None;
    }
}
