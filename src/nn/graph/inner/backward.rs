/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 反向传播：VJP按拓扑序回传，支持保留计算图（retain）以便同一前向多次backward
 */

use super::GraphInner;
use crate::nn::GraphError;
use crate::nn::nodes::NodeId;
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet, VecDeque};

impl GraphInner {
    /// 反向传播：从`target_id`（通常是[1, 1]的损失节点）出发，把梯度回传到所有
    /// 参与计算的祖先节点。
    ///
    /// - 非Parameter节点的旧梯度在传播前清零；Parameter节点的梯度跨多次backward
    ///   累加，直到优化器调用`zero_grad`。
    /// - Input节点与detach边界不接收梯度，传播到此为止。
    /// - `retain = true`时保留所有中间值，同一次前向可以再次backward（多网络
    ///   各自的损失依次回传时用）；`retain = false`时释放中间值并作废前向缓存。
    pub(in crate::nn) fn backward_node(
        &mut self,
        target_id: NodeId,
        retain: bool,
    ) -> Result<(), GraphError> {
        // 1. 收集参与反向传播的祖先集合（不越过detach边界，不含Input）
        let involved = self.collect_involved(target_id)?;

        // 2. 清零集合内非Parameter节点的旧梯度
        for &id in &involved {
            let handle = self.get_node_mut(id)?;
            if !handle.is_parameter() {
                handle.set_grad(None)?;
            }
        }

        // 3. 损失节点自身的梯度为全1
        {
            let handle = self.get_node_mut(target_id)?;
            let ones = Tensor::ones(handle.value_expected_shape());
            if handle.is_parameter() {
                handle.accumulate_grad(&ones)?;
            } else {
                handle.set_grad(Some(&ones))?;
            }
        }

        // 4. 统计集合内每个节点的"待处理消费者"数。只有当某节点的所有消费者都已
        //    把梯度传给它之后，它自身的梯度才完整，才能继续向它的父节点传播。
        let mut pending: HashMap<NodeId, usize> = involved.iter().map(|&id| (id, 0)).collect();
        for &id in &involved {
            for parent_id in self.grad_receiving_parents(id)? {
                if let Some(count) = pending.get_mut(&parent_id) {
                    *count += 1;
                }
            }
        }

        // 5. 按拓扑序传播
        let mut queue = VecDeque::new();
        queue.push_back(target_id);
        while let Some(node_id) = queue.pop_front() {
            let receivers = self.grad_receiving_parents(node_id)?;
            if !receivers.is_empty() {
                let computed = self.calc_grads_to_parents(node_id, &receivers)?;
                for (parent_id, grad) in computed {
                    self.get_node_mut(parent_id)?.accumulate_grad(&grad)?;
                }
            }
            for parent_id in receivers {
                if let Some(count) = pending.get_mut(&parent_id) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(parent_id);
                    }
                }
            }
        }

        // 6. 不保留计算图时，释放所有非叶子节点的中间值
        if !retain {
            self.release_intermediate_values();
        }
        Ok(())
    }

    /// 从target出发沿父边DFS，收集所有参与反向传播的节点。
    /// 遇到detach边界或Input节点时不继续深入。
    fn collect_involved(&self, target_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut involved = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![target_id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            involved.push(id);
            let handle = self.get_node(id)?;
            if handle.is_detached() {
                continue;
            }
            for &parent_id in handle.parents_ids() {
                let parent = self.get_node(parent_id)?;
                if parent.is_input() {
                    continue;
                }
                stack.push(parent_id);
            }
        }
        Ok(involved)
    }

    /// `node_id`的父节点中应接收梯度的那些（剔除Input与detach边界）
    fn grad_receiving_parents(&self, node_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let handle = self.get_node(node_id)?;
        if handle.is_detached() || handle.is_leaf() {
            return Ok(Vec::new());
        }
        let mut receivers = Vec::new();
        for &parent_id in handle.parents_ids() {
            let parent = self.get_node(parent_id)?;
            if parent.is_input() || parent.is_detached() {
                continue;
            }
            receivers.push(parent_id);
        }
        Ok(receivers)
    }

    /// 计算`node_id`对给定各父节点的梯度（不立即写回，避免同时持有可变借用）
    fn calc_grads_to_parents(
        &self,
        node_id: NodeId,
        receivers: &[NodeId],
    ) -> Result<Vec<(NodeId, Tensor)>, GraphError> {
        let handle = self.get_node(node_id)?;
        let upstream = handle.grad().ok_or_else(|| {
            GraphError::ComputationError(format!("{handle}没有梯度，反向传播顺序异常"))
        })?;
        let parent_refs = self.parents_refs(handle.parents_ids())?;

        let mut computed = Vec::with_capacity(receivers.len());
        for &parent_id in receivers {
            let parent = self.get_node(parent_id)?;
            let grad = handle.calc_grad_to_parent(parent, upstream, &parent_refs)?;
            computed.push((parent_id, grad));
        }
        Ok(computed)
    }

    /// 释放所有非叶子节点的值并作废前向缓存
    fn release_intermediate_values(&mut self) {
        for handle in self.nodes.values_mut() {
            if !handle.is_leaf() {
                handle.clear_value();
            }
        }
        self.invalidate_forward_cache();
    }
}
