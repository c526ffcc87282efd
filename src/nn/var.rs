/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Var：节点的智能句柄（图句柄 + 节点id），提供PyTorch风格的变量API
 */

use crate::nn::graph::{Graph, GraphError};
use crate::nn::nodes::NodeId;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use std::ops::{Add, Sub};

/// 参数初始化方式
#[derive(Debug, Clone, Copy)]
pub enum Init {
    Zeros,
    Ones,
    Constant(f32),
    Normal { mean: f32, std: f32 },
    /// He初始化（LeakyReLU/ReLU前的卷积层用）
    Kaiming,
    /// Glorot均匀初始化
    Xavier,
}

impl Init {
    /// 按初始化方式生成给定形状的张量。
    /// 对卷积核[C_out, C_in, kH, kW]，fan_in取`C_in·kH·kW`，fan_out取`C_out·kH·kW`。
    pub fn generate(&self, shape: &[usize], rng: &mut StdRng) -> Tensor {
        match self {
            Init::Zeros => Tensor::zeros(shape),
            Init::Ones => Tensor::ones(shape),
            Init::Constant(v) => Tensor::full(*v, shape),
            Init::Normal { mean, std } => Tensor::new_normal(*mean, *std, shape, rng),
            Init::Kaiming => {
                let fan_in: usize = shape[1..].iter().product::<usize>().max(1);
                let std = (2.0 / fan_in as f32).sqrt();
                Tensor::new_normal(0.0, std, shape, rng)
            }
            Init::Xavier => {
                let fan_in: usize = shape[1..].iter().product::<usize>().max(1);
                let fan_out: usize = if shape.len() >= 2 {
                    (shape[0] * shape[2..].iter().product::<usize>()).max(1)
                } else {
                    shape[0].max(1)
                };
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Tensor::new_random(-limit, limit, shape, rng)
            }
        }
    }
}

/// 图中一个节点的句柄。克隆开销极小（图本身是共享的）。
#[derive(Clone)]
pub struct Var {
    graph: Graph,
    node_id: NodeId,
}

impl Var {
    pub(crate) fn from_node(graph: Graph, node_id: NodeId) -> Self {
        Self { graph, node_id }
    }

    /// 创建Input节点（外部输入，每个训练步由外部喂值）
    pub fn input(graph: &Graph, shape: &[usize], name: &str) -> Result<Self, GraphError> {
        let node_id = graph.new_input(shape, name)?;
        Ok(Self::from_node(graph.clone(), node_id))
    }

    /// 创建带初值的Input节点（冻结模块的权重常量：不参与训练，不接收梯度）
    pub fn constant(graph: &Graph, value: &Tensor, name: &str) -> Result<Self, GraphError> {
        let node_id = graph.new_input_with_value(value, name)?;
        Ok(Self::from_node(graph.clone(), node_id))
    }

    /// 创建Parameter节点（可训练参数）
    pub fn parameter(graph: &Graph, value: Tensor, name: &str) -> Result<Self, GraphError> {
        let node_id = graph.new_parameter(value, name)?;
        Ok(Self::from_node(graph.clone(), node_id))
    }

    /// 沿通道维拼接若干4D变量
    pub fn concat(vars: &[&Var], name: Option<&str>) -> Result<Self, GraphError> {
        let first = vars.first().ok_or_else(|| {
            GraphError::InvalidOperation("concat至少需要1个变量".to_string())
        })?;
        if vars.iter().any(|v| !v.graph.same_graph(&first.graph)) {
            return Err(GraphError::InvalidOperation(
                "concat的变量必须属于同一张计算图".to_string(),
            ));
        }
        let ids: Vec<NodeId> = vars.iter().map(|v| v.node_id).collect();
        let node_id = first.graph.new_concat(&ids, name)?;
        Ok(Self::from_node(first.graph.clone(), node_id))
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn name(&self) -> Result<String, GraphError> {
        self.graph.node_name(self.node_id)
    }

    pub fn shape(&self) -> Result<Vec<usize>, GraphError> {
        self.graph.node_value_expected_shape(self.node_id)
    }

    /// 前向传播：计算本节点及所有祖先的值（本轮已算过的节点直接复用）
    pub fn forward(&self) -> Result<(), GraphError> {
        self.graph.forward(self.node_id)
    }

    /// 反向传播并释放中间值（每个训练步的最后一次backward用）
    pub fn backward(&self) -> Result<(), GraphError> {
        self.graph.backward(self.node_id, false)
    }

    /// 反向传播但保留计算图，同一次前向可继续backward其他损失
    pub fn backward_retain(&self) -> Result<(), GraphError> {
        self.graph.backward(self.node_id, true)
    }

    pub fn value(&self) -> Result<Tensor, GraphError> {
        self.graph.node_value(self.node_id)?.ok_or_else(|| {
            GraphError::ComputationError("节点没有值，请先执行前向传播".to_string())
        })
    }

    pub fn has_value(&self) -> Result<bool, GraphError> {
        Ok(self.graph.node_value(self.node_id)?.is_some())
    }

    pub fn set_value(&self, value: &Tensor) -> Result<(), GraphError> {
        self.graph.set_node_value(self.node_id, value)
    }

    pub fn grad(&self) -> Result<Option<Tensor>, GraphError> {
        self.graph.node_grad(self.node_id)
    }

    pub fn clear_grad(&self) -> Result<(), GraphError> {
        self.graph.clear_node_grad(self.node_id)
    }

    /// 标量节点（如损失）的值
    pub fn item(&self) -> Result<f32, GraphError> {
        self.value()?.number().ok_or_else(|| {
            GraphError::ComputationError("节点的值不是标量，无法取item".to_string())
        })
    }

    /// 从计算图中"分离"：返回一个新变量，前向时复制本变量的值，
    /// 反向传播到新变量为止、不再深入本变量的祖先（PyTorch的`.detach()`）
    pub fn detach(&self) -> Result<Self, GraphError> {
        let node_id = self.graph.new_identity_detached(self.node_id, None)?;
        Ok(Self::from_node(self.graph.clone(), node_id))
    }

    pub fn try_add(&self, other: &Var, name: Option<&str>) -> Result<Self, GraphError> {
        let node_id = self.graph.new_add(&[self.node_id, other.node_id], name)?;
        Ok(Self::from_node(self.graph.clone(), node_id))
    }

    pub fn try_sub(&self, other: &Var, name: Option<&str>) -> Result<Self, GraphError> {
        let node_id = self.graph.new_subtract(self.node_id, other.node_id, name)?;
        Ok(Self::from_node(self.graph.clone(), node_id))
    }
}

impl Add for &Var {
    type Output = Var;

    fn add(self, other: &Var) -> Var {
        self.try_add(other, None).expect("Var相加失败")
    }
}

impl Sub for &Var {
    type Output = Var;

    fn sub(self, other: &Var) -> Var {
        self.try_sub(other, None).expect("Var相减失败")
    }
}
