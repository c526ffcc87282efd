/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 计算图内部实现：节点存储、前向传播（带记忆化）、名称注册
 */

mod backward;
mod node_builders;
mod serialization;

use crate::nn::GraphError;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use std::collections::HashMap;

/// 计算图的内部状态（由`Graph`通过`Rc<RefCell<_>>`共享）
pub(in crate::nn) struct GraphInner {
    nodes: HashMap<NodeId, NodeHandle>,
    name_registry: HashMap<String, NodeId>,
    parameter_ids: Vec<NodeId>,
    next_id: u64,
    /// 前向传播代号：每次外部修改叶子节点的值后自增。
    /// 节点的`last_computed_pass`与它相等时说明该节点的值在本轮已算过，
    /// 同一轮内多个损失共享一次前向计算的结果。
    forward_pass_id: u64,
}

impl GraphInner {
    pub(in crate::nn) fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            name_registry: HashMap::new(),
            parameter_ids: Vec::new(),
            next_id: 1,
            forward_pass_id: 1,
        }
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn parameter_ids(&self) -> &[NodeId] {
        &self.parameter_ids
    }

    pub(in crate::nn) fn node_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_registry.get(name).copied()
    }

    fn parents_refs(&self, ids: &[NodeId]) -> Result<Vec<&NodeHandle>, GraphError> {
        ids.iter()
            .map(|id| self.nodes.get(id).ok_or(GraphError::NodeNotFound(*id)))
            .collect()
    }

    /// 作废本轮前向缓存：下一次forward会重新计算所有途经节点
    fn invalidate_forward_cache(&mut self) {
        self.forward_pass_id += 1;
    }

    /// 为叶子节点（Input/Parameter）设置值，并作废前向缓存
    pub(in crate::nn) fn set_node_value(
        &mut self,
        id: NodeId,
        value: &Tensor,
    ) -> Result<(), GraphError> {
        let handle = self.get_node_mut(id)?;
        if !handle.is_leaf() {
            return Err(GraphError::InvalidOperation(format!(
                "{handle}不是Input/Parameter节点，不能直接设置值"
            )));
        }
        handle.set_value(value)?;
        self.invalidate_forward_cache();
        Ok(())
    }

    pub(in crate::nn) fn node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.value())
    }

    pub(in crate::nn) fn node_grad(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.grad())
    }

    pub(in crate::nn) fn clear_node_grad(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_grad(None)
    }

    /// 前向传播：递归计算`node_id`及其所有祖先的值。
    /// 本轮已算过的节点直接复用缓存值。
    pub(in crate::nn) fn forward_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let (computed, is_leaf, parents_ids) = {
            let handle = self.get_node(node_id)?;
            (
                handle.last_computed_pass() == self.forward_pass_id,
                handle.is_leaf(),
                handle.parents_ids().to_vec(),
            )
        };
        if computed {
            return Ok(());
        }

        if is_leaf {
            if self.get_node(node_id)?.value().is_none() {
                let name = self.get_node(node_id)?.name().to_string();
                return Err(GraphError::ComputationError(format!(
                    "节点[{name}]没有值，请先为其设置值"
                )));
            }
            let pass = self.forward_pass_id;
            self.get_node_mut(node_id)?.set_last_computed_pass(pass);
            return Ok(());
        }

        for parent_id in &parents_ids {
            self.forward_node(*parent_id)?;
        }

        // 把本节点暂时从表中取出，以便同时持有它的可变借用与父节点的只读借用
        let mut handle = self
            .nodes
            .remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let result = {
            let parent_refs = self.parents_refs(&parents_ids);
            match parent_refs {
                Ok(refs) => handle.calc_value_by_parents(&refs),
                Err(e) => Err(e),
            }
        };
        handle.set_last_computed_pass(self.forward_pass_id);
        self.nodes.insert(node_id, handle);
        result
    }
}
