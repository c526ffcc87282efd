/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 节点层：NodeId、NodeHandle（节点元数据包装）与底层raw节点
 */

pub(crate) mod raw_node;

#[cfg(test)]
mod tests;

use crate::nn::GraphError;
use crate::tensor::Tensor;
use raw_node::{NodeType, TraitNode};
use std::fmt;

/// 节点在计算图中的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 节点包装：raw节点 + 图级元数据（父节点、detach标记、前向传播代号）
pub(crate) struct NodeHandle {
    node: NodeType,
    parents_ids: Vec<NodeId>,
    is_detached: bool,
    last_computed_pass: u64,
}

impl NodeHandle {
    pub(crate) fn new(node: NodeType, parents_ids: Vec<NodeId>) -> Self {
        Self {
            node,
            parents_ids,
            is_detached: false,
            last_computed_pass: 0,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.node.id()
    }

    pub(crate) fn name(&self) -> &str {
        self.node.name()
    }

    pub(crate) fn node_type(&self) -> &NodeType {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut NodeType {
        &mut self.node
    }

    pub(crate) fn parents_ids(&self) -> &[NodeId] {
        &self.parents_ids
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.is_detached
    }

    pub(crate) fn set_detached(&mut self, detached: bool) {
        self.is_detached = detached;
    }

    pub(crate) fn last_computed_pass(&self) -> u64 {
        self.last_computed_pass
    }

    pub(crate) fn set_last_computed_pass(&mut self, pass: u64) {
        self.last_computed_pass = pass;
    }

    /// 是否为叶子节点（Input或Parameter，值由外部提供而非由父节点计算）
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.node, NodeType::Input(_) | NodeType::Parameter(_))
    }

    /// 是否为可训练参数节点
    pub(crate) fn is_parameter(&self) -> bool {
        matches!(self.node, NodeType::Parameter(_))
    }

    /// 是否为Input（常量/外部输入）节点。Input节点永远不存储梯度。
    pub(crate) fn is_input(&self) -> bool {
        matches!(self.node, NodeType::Input(_))
    }

    pub(crate) fn value(&self) -> Option<&Tensor> {
        self.node.value()
    }

    pub(crate) fn value_expected_shape(&self) -> &[usize] {
        self.node.value_expected_shape()
    }

    /// 设置节点值，并校验形状与期望形状严格一致
    pub(crate) fn set_value(&mut self, value: &Tensor) -> Result<(), GraphError> {
        let expected = self.node.value_expected_shape();
        if value.shape() != expected {
            return Err(GraphError::ShapeMismatch {
                expected: expected.to_vec(),
                got: value.shape().to_vec(),
                message: format!("为{}设置的值形状不符", self.node.display_node()),
            });
        }
        self.node.set_value(Some(value))
    }

    pub(crate) fn clear_value(&mut self) {
        self.node.clear_value();
    }

    pub(crate) fn grad(&self) -> Option<&Tensor> {
        self.node.grad()
    }

    pub(crate) fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.node.set_grad(grad)
    }

    /// 向本节点累加梯度（已有梯度则相加，否则直接设置）
    pub(crate) fn accumulate_grad(&mut self, grad: &Tensor) -> Result<(), GraphError> {
        let new_grad = match self.node.grad() {
            Some(existing) => existing + grad,
            None => grad.clone(),
        };
        self.node.set_grad(Some(&new_grad))
    }

    pub(crate) fn calc_value_by_parents(
        &mut self,
        parents: &[&NodeHandle],
    ) -> Result<(), GraphError> {
        self.node.calc_value_by_parents(parents)
    }

    pub(crate) fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        self.node
            .calc_grad_to_parent(target_parent, upstream_grad, parents)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node.display_node())
    }
}
