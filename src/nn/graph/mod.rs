/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 计算图的外层句柄：可克隆、内部共享，所有Var/层/优化器都通过它访问同一张图
 */

mod error;
mod inner;

pub use error::GraphError;

use crate::nn::nodes::NodeId;
use crate::nn::nodes::raw_node::Reduction;
use crate::tensor::Tensor;
use inner::GraphInner;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// 计算图句柄
///
/// 克隆只是增加引用计数，所有克隆共享同一张图。训练中的五个网络
/// 与五个损失都建在同一张图上，一次前向传播的中间值可被多个损失复用。
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new())),
        }
    }

    /// 两个句柄是否指向同一张图
    pub fn same_graph(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓前向/反向传播↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    pub(crate) fn forward(&self, node_id: NodeId) -> Result<(), GraphError> {
        self.inner.borrow_mut().forward_node(node_id)
    }

    pub(crate) fn backward(&self, node_id: NodeId, retain: bool) -> Result<(), GraphError> {
        self.inner.borrow_mut().backward_node(node_id, retain)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓节点值/梯度访问↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    pub(crate) fn node_value(&self, node_id: NodeId) -> Result<Option<Tensor>, GraphError> {
        Ok(self.inner.borrow().node_value(node_id)?.cloned())
    }

    pub(crate) fn set_node_value(
        &self,
        node_id: NodeId,
        value: &Tensor,
    ) -> Result<(), GraphError> {
        self.inner.borrow_mut().set_node_value(node_id, value)
    }

    pub(crate) fn node_grad(&self, node_id: NodeId) -> Result<Option<Tensor>, GraphError> {
        Ok(self.inner.borrow().node_grad(node_id)?.cloned())
    }

    pub(crate) fn clear_node_grad(&self, node_id: NodeId) -> Result<(), GraphError> {
        self.inner.borrow_mut().clear_node_grad(node_id)
    }

    pub(crate) fn node_value_expected_shape(
        &self,
        node_id: NodeId,
    ) -> Result<Vec<usize>, GraphError> {
        Ok(self
            .inner
            .borrow()
            .get_node(node_id)?
            .value_expected_shape()
            .to_vec())
    }

    pub(crate) fn node_name(&self, node_id: NodeId) -> Result<String, GraphError> {
        Ok(self.inner.borrow().get_node(node_id)?.name().to_string())
    }

    /// 图中所有Parameter节点的id
    pub fn parameter_ids(&self) -> Vec<NodeId> {
        self.inner.borrow().parameter_ids().to_vec()
    }

    pub fn node_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.inner.borrow().node_id_by_name(name)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓节点创建↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    pub(crate) fn new_input(&self, shape: &[usize], name: &str) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_input(shape, name)
    }

    pub(crate) fn new_input_with_value(
        &self,
        value: &Tensor,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_input_with_value(value, name)
    }

    pub(crate) fn new_parameter(&self, value: Tensor, name: &str) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_parameter(value, name)
    }

    pub(crate) fn new_add(
        &self,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_add(parents, name)
    }

    pub(crate) fn new_subtract(
        &self,
        left: NodeId,
        right: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_subtract(left, right, name)
    }

    pub(crate) fn new_scalar_multiply(
        &self,
        parent: NodeId,
        factor: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_scalar_multiply(parent, factor, name)
    }

    pub(crate) fn new_concat(
        &self,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_concat(parents, name)
    }

    pub(crate) fn new_conv2d(
        &self,
        input: NodeId,
        kernel: NodeId,
        stride: (usize, usize),
        padding: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_conv2d(input, kernel, stride, padding, name)
    }

    pub(crate) fn new_channel_bias_add(
        &self,
        input: NodeId,
        bias: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_channel_bias_add(input, bias, name)
    }

    pub(crate) fn new_leaky_relu(
        &self,
        parent: NodeId,
        alpha: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_leaky_relu(parent, alpha, name)
    }

    pub(crate) fn new_sigmoid(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_sigmoid(parent, name)
    }

    pub(crate) fn new_tanh(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_tanh(parent, name)
    }

    pub(crate) fn new_channel_softmax(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_channel_softmax(parent, name)
    }

    pub(crate) fn new_upsample_nearest(
        &self,
        parent: NodeId,
        scale: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_upsample_nearest(parent, scale, name)
    }

    pub(crate) fn new_identity_detached(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_identity_detached(parent, name)
    }

    pub(crate) fn new_unfold(
        &self,
        parent: NodeId,
        size: (usize, usize),
        stride: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_unfold(parent, size, stride, name)
    }

    pub(crate) fn new_gram(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner.borrow_mut().new_gram(parent, name)
    }

    pub(crate) fn new_l1_loss(
        &self,
        prediction: NodeId,
        target: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_l1_loss(prediction, target, name)
    }

    pub(crate) fn new_mse_loss(
        &self,
        prediction: NodeId,
        target: NodeId,
        reduction: Reduction,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_mse_loss(prediction, target, reduction, name)
    }

    pub(crate) fn new_bce_loss(
        &self,
        prediction: NodeId,
        target: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.inner
            .borrow_mut()
            .new_bce_loss(prediction, target, name)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓参数序列化↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/

    /// 保存图中所有Parameter节点的值到文件
    pub fn save_params(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        self.inner.borrow().save_params(path.as_ref())
    }

    /// 从文件加载参数（按名称匹配）
    pub fn load_params(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        self.inner.borrow_mut().load_params(path.as_ref())
    }
}
