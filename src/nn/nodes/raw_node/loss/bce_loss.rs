use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 预测概率的钳位下限，防止ln(0)
const EPSILON: f32 = 1e-7;

/// 二元交叉熵损失节点：`value = -mean(t·ln(p) + (1-t)·ln(1-p))`，输出[1, 1]
///
/// 父节点：
/// - parents[0]: 预测概率（应在(0, 1)内，内部会钳位到[ε, 1-ε]）
/// - parents[1]: 目标（0/1或[0, 1]内的软目标）
#[derive(Clone)]
pub(crate) struct BceLoss {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parents_ids: Vec<NodeId>,
    /// 前向时缓存的钳位后预测概率
    clamped_prediction: Option<Tensor>,
}

impl BceLoss {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "BceLoss节点需要2个父节点：[预测, 目标]".to_string(),
            ));
        }
        let pred_shape = parents[0].value_expected_shape();
        let target_shape = parents[1].value_expected_shape();
        if pred_shape != target_shape {
            return Err(GraphError::ShapeMismatch {
                expected: pred_shape.to_vec(),
                got: target_shape.to_vec(),
                message: "BceLoss的预测与目标形状必须一致".to_string(),
            });
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![1, 1],
            parents_ids: vec![parents[0].id(), parents[1].id()],
            clamped_prediction: None,
        })
    }
}

impl TraitNode for BceLoss {
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

        let clamped = prediction.map(|p| p.clamp(EPSILON, 1.0 - EPSILON));
        let log_p = clamped.map(f32::ln);
        let log_one_minus_p = clamped.map(|p| (1.0 - p).ln());
        let ones = Tensor::ones(target.shape());
        let loss = -(&(target * &log_p) + &(&(&ones - target) * &log_one_minus_p)).mean_all();
        self.value = Some(Tensor::new(&[loss], &[1, 1]));
        self.clamped_prediction = Some(clamped);
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
        parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let scale = upstream_grad.number().ok_or_else(|| {
            GraphError::ComputationError("损失节点的上游梯度必须是标量".to_string())
        })?;
        let clamped = self.clamped_prediction.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有缓存预测概率，需先执行前向传播",
                self.display_node()
            ))
        })?;
        let target = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的目标父节点没有值", self.display_node()))
        })?;

        let numel = clamped.size() as f32;
        if target_parent.id() == self.parents_ids[0] {
            // dL/dp = (p - t) / (p·(1-p)) / N
            let numerator = clamped - target;
            let reciprocal = clamped.map(|p| 1.0 / (p * (1.0 - p)));
            Ok(&(&numerator * &reciprocal) * (scale / numel))
        } else {
            // dL/dt = (ln(1-p) - ln(p)) / N
            let grad = clamped.map(|p| ((1.0 - p).ln() - p.ln()) / numel * scale);
            Ok(grad)
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
        self.clamped_prediction = None;
    }
}
