use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

use super::{NodeHandle, TraitNode};

/// Input（输入/常量）节点
///
/// 值由外部提供：训练数据、目标张量、以及冻结模块的权重都用本类型承载。
/// Input节点永远不存储梯度，反向传播在此截止（但梯度可以穿过以它为父的算子流向其它分支）。
#[derive(Clone)]
pub(crate) struct Input {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Input {
    pub(crate) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        if shape.is_empty() {
            return Err(GraphError::InvalidOperation(
                "Input节点的形状不能为空".to_string(),
            ));
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            shape: shape.to_vec(),
        })
    }

    /// 创建带初始值的Input节点（常量/冻结权重）
    pub(crate) fn with_value(value: &Tensor) -> Result<Self, GraphError> {
        let mut input = Self::new(value.shape())?;
        input.value = Some(value.clone());
        Ok(input)
    }
}

impl TraitNode for Input {
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

    fn calc_value_by_parents(&mut self, _parents: &[&NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}是输入节点，值应由外部设置而不是由前向传播计算",
            self.display_node()
        )))
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
        _upstream_grad: &Tensor,
        _parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}没有父节点，无法计算对父节点的梯度",
            self.display_node()
        )))
    }

    fn grad(&self) -> Option<&Tensor> {
        None
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        if grad.is_some() {
            return Err(GraphError::InvalidOperation(format!(
                "{}是输入节点，不应存储梯度",
                self.display_node()
            )));
        }
        Ok(())
    }

    fn clear_value(&mut self) {
        // 输入/常量节点的值由外部管理，释放中间结果时不清除
    }
}
