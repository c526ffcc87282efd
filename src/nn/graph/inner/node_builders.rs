/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 各类节点的创建与注册（id分配、命名去重）
 */

use super::GraphInner;
use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{
    Add, BceLoss, ChannelBiasAdd, ChannelSoftmax, Concat, Conv2d, Gram, Identity, Input, L1Loss,
    LeakyRelu, MseLoss, NodeType, Parameter, Reduction, ScalarMultiply, Sigmoid, Subtract, Tanh,
    TraitNode, Unfold, UpsampleNearest,
};
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

impl GraphInner {
    /// 注册节点：分配id与名称。
    ///
    /// Input/Parameter节点（`strict_name = true`）的名称必须唯一，因为参数
    /// 序列化按名称寻址；算子节点重名时自动追加`_{id}`后缀（同一层的forward
    /// 被调用多次时会出现）。
    fn register_node(
        &mut self,
        mut node: NodeType,
        parents_ids: Vec<NodeId>,
        name: Option<&str>,
        strict_name: bool,
        default_prefix: &str,
    ) -> Result<NodeId, GraphError> {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.set_id(id);

        let desired = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{default_prefix}_{id}"));
        let final_name = if self.name_registry.contains_key(&desired) {
            if strict_name {
                return Err(GraphError::DuplicateNodeName(desired));
            }
            format!("{desired}_{id}")
        } else {
            desired
        };
        node.set_name(&final_name);
        self.name_registry.insert(final_name, id);

        if matches!(node, NodeType::Parameter(_)) {
            self.parameter_ids.push(id);
        }
        self.nodes.insert(id, NodeHandle::new(node, parents_ids));
        Ok(id)
    }

    pub(in crate::nn) fn new_input(
        &mut self,
        shape: &[usize],
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let node = NodeType::Input(Input::new(shape)?);
        self.register_node(node, Vec::new(), Some(name), true, "input")
    }

    /// 带初值的Input节点（冻结模块的权重常量用）
    pub(in crate::nn) fn new_input_with_value(
        &mut self,
        value: &Tensor,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let node = NodeType::Input(Input::with_value(value)?);
        self.register_node(node, Vec::new(), Some(name), true, "input")
    }

    pub(in crate::nn) fn new_parameter(
        &mut self,
        value: Tensor,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        let node = NodeType::Parameter(Parameter::new(value)?);
        self.register_node(node, Vec::new(), Some(name), true, "parameter")
    }

    pub(in crate::nn) fn new_add(
        &mut self,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeType::Add(Add::new(&self.parents_refs(parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "add")
    }

    pub(in crate::nn) fn new_subtract(
        &mut self,
        left: NodeId,
        right: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [left, right];
        let node = NodeType::Subtract(Subtract::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "subtract")
    }

    pub(in crate::nn) fn new_scalar_multiply(
        &mut self,
        parent: NodeId,
        factor: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node =
            NodeType::ScalarMultiply(ScalarMultiply::new(&self.parents_refs(&parents)?, factor)?);
        self.register_node(node, parents.to_vec(), name, false, "scalar_multiply")
    }

    pub(in crate::nn) fn new_concat(
        &mut self,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeType::Concat(Concat::new(&self.parents_refs(parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "concat")
    }

    pub(in crate::nn) fn new_conv2d(
        &mut self,
        input: NodeId,
        kernel: NodeId,
        stride: (usize, usize),
        padding: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [input, kernel];
        let node = NodeType::Conv2d(Conv2d::new(&self.parents_refs(&parents)?, stride, padding)?);
        self.register_node(node, parents.to_vec(), name, false, "conv2d")
    }

    pub(in crate::nn) fn new_channel_bias_add(
        &mut self,
        input: NodeId,
        bias: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [input, bias];
        let node = NodeType::ChannelBiasAdd(ChannelBiasAdd::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "bias_add")
    }

    pub(in crate::nn) fn new_leaky_relu(
        &mut self,
        parent: NodeId,
        alpha: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::LeakyRelu(LeakyRelu::new(&self.parents_refs(&parents)?, alpha)?);
        self.register_node(node, parents.to_vec(), name, false, "leaky_relu")
    }

    pub(in crate::nn) fn new_sigmoid(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::Sigmoid(Sigmoid::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "sigmoid")
    }

    pub(in crate::nn) fn new_tanh(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::Tanh(Tanh::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "tanh")
    }

    pub(in crate::nn) fn new_channel_softmax(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::ChannelSoftmax(ChannelSoftmax::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "channel_softmax")
    }

    pub(in crate::nn) fn new_upsample_nearest(
        &mut self,
        parent: NodeId,
        scale: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node =
            NodeType::UpsampleNearest(UpsampleNearest::new(&self.parents_refs(&parents)?, scale)?);
        self.register_node(node, parents.to_vec(), name, false, "upsample")
    }

    /// detach边界：前向复制父节点的值，反向传播到此截止
    pub(in crate::nn) fn new_identity_detached(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::Identity(Identity::new(&self.parents_refs(&parents)?)?);
        let id = self.register_node(node, parents.to_vec(), name, false, "detach")?;
        self.get_node_mut(id)?.set_detached(true);
        Ok(id)
    }

    pub(in crate::nn) fn new_unfold(
        &mut self,
        parent: NodeId,
        size: (usize, usize),
        stride: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::Unfold(Unfold::new(&self.parents_refs(&parents)?, size, stride)?);
        self.register_node(node, parents.to_vec(), name, false, "unfold")
    }

    pub(in crate::nn) fn new_gram(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [parent];
        let node = NodeType::Gram(Gram::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "gram")
    }

    pub(in crate::nn) fn new_l1_loss(
        &mut self,
        prediction: NodeId,
        target: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [prediction, target];
        let node = NodeType::L1Loss(L1Loss::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "l1_loss")
    }

    pub(in crate::nn) fn new_mse_loss(
        &mut self,
        prediction: NodeId,
        target: NodeId,
        reduction: Reduction,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [prediction, target];
        let node = NodeType::MseLoss(MseLoss::new(&self.parents_refs(&parents)?, reduction)?);
        self.register_node(node, parents.to_vec(), name, false, "mse_loss")
    }

    pub(in crate::nn) fn new_bce_loss(
        &mut self,
        prediction: NodeId,
        target: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [prediction, target];
        let node = NodeType::BceLoss(BceLoss::new(&self.parents_refs(&parents)?)?);
        self.register_node(node, parents.to_vec(), name, false, "bce_loss")
    }
}
