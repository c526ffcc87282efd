/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : raw节点：每种算子/损失的前向值计算与VJP梯度计算
 */

pub(crate) mod input;
pub(crate) mod loss;
pub(crate) mod ops;
pub(crate) mod parameter;

pub(in crate::nn) use input::Input;
pub(in crate::nn) use loss::{BceLoss, L1Loss, MseLoss, Reduction};
pub(in crate::nn) use ops::{
    Add, ChannelBiasAdd, ChannelSoftmax, Concat, Conv2d, Gram, Identity, LeakyRelu, ScalarMultiply,
    Sigmoid, Subtract, Tanh, Unfold, UpsampleNearest,
};
pub(in crate::nn) use parameter::Parameter;

use super::{NodeHandle, NodeId};
use crate::nn::GraphError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

#[enum_dispatch]
pub(in crate::nn) enum NodeType {
    Input(Input),
    Parameter(Parameter),
    Add(Add),
    Subtract(Subtract),
    ScalarMultiply(ScalarMultiply),
    Concat(Concat),
    Conv2d(Conv2d),
    ChannelBiasAdd(ChannelBiasAdd),
    LeakyRelu(LeakyRelu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    ChannelSoftmax(ChannelSoftmax),
    UpsampleNearest(UpsampleNearest),
    Identity(Identity),
    Unfold(Unfold),
    Gram(Gram),
    L1Loss(L1Loss),
    MseLoss(MseLoss),
    BceLoss(BceLoss),
}

#[enum_dispatch(NodeType)]
pub(in crate::nn) trait TraitNode {
    fn id(&self) -> NodeId;

    fn set_id(&mut self, id: NodeId);

    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// 本节点值（张量）的期望形状（在建图时静态确定）
    fn value_expected_shape(&self) -> &[usize];

    /// 根据父节点的值计算本节点的值。
    /// 注意：该接口只在Graph中使用，调用时所有父节点的值都已预先被计算过。
    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError>;

    fn value(&self) -> Option<&Tensor>;

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError>;

    /// VJP：给定上游梯度（dL/d本节点），计算dL/d(target_parent)。
    /// `parents`是本节点的全部父节点（拼接等多父节点算子需要它们来定位切片区间）。
    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError>;

    fn grad(&self) -> Option<&Tensor>;

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError>;

    fn clear_value(&mut self);

    fn display_node(&self) -> String {
        format!("节点[{}]", self.name())
    }
}
