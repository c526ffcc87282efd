use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// Gram矩阵节点（风格损失的核心）
///
/// 把输入的最后两维之前的所有维度压平成m、最后两维压平成n，
/// 得到特征矩阵F(m, n)，输出 `G = F·Fᵀ / numel`（numel为输入元素总数）。
/// 4D特征图[b, c, h, w]与5D分块特征[b, c, p, pH, pW]都按此规则处理。
///
/// 反向传播：`dL/dF = (U + Uᵀ)·F / numel`，再还原为输入形状。
#[derive(Clone)]
pub(crate) struct Gram {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    input_shape: Vec<usize>,
    flat_rows: usize,
    flat_cols: usize,
}

impl Gram {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Gram节点需要1个父节点".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        if input_shape.len() < 3 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: "Gram的输入至少需要3个维度".to_string(),
            });
        }
        let split = input_shape.len() - 2;
        let flat_rows: usize = input_shape[..split].iter().product();
        let flat_cols: usize = input_shape[split..].iter().product();
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![flat_rows, flat_rows],
            input_shape: input_shape.to_vec(),
            flat_rows,
            flat_cols,
        })
    }
}

impl TraitNode for Gram {
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
        let x = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        let features = x.reshape(&[self.flat_rows, self.flat_cols]);
        let numel = (self.flat_rows * self.flat_cols) as f32;
        let gram = features.mat_mul(&features.transpose_2d());
        self.value = Some(&gram * (1.0 / numel));
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
        _target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let x = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        let features = x.reshape(&[self.flat_rows, self.flat_cols]);
        let numel = (self.flat_rows * self.flat_cols) as f32;
        // dL/dF = (U + Uᵀ)·F / numel
        let symmetric = upstream_grad + &upstream_grad.transpose_2d();
        let grad_flat = &symmetric.mat_mul(&features) * (1.0 / numel);
        Ok(grad_flat.reshape(&self.input_shape))
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
    }
}
