use crate::nn::graph::GraphError;
use crate::nn::var::Var;

/// 风格/结构类算子（Gram矩阵、滑窗展开、上采样、纯数缩放）
pub trait VarStyleOps {
    /// Gram矩阵：`G = F·Fᵀ / numel`，F是压平后的特征矩阵
    fn gram(&self) -> Result<Var, GraphError>;

    /// 滑窗展开：[b, C, H, W] → [b, C, P, pH, pW]
    fn unfold(&self, size: (usize, usize), stride: (usize, usize)) -> Result<Var, GraphError>;

    /// 最近邻上采样
    fn upsample_nearest(&self, scale: usize) -> Result<Var, GraphError>;

    /// 纯数缩放：`factor·x`（复合损失的权重项）
    fn scaled(&self, factor: f32) -> Result<Var, GraphError>;
}

impl VarStyleOps for Var {
    fn gram(&self) -> Result<Var, GraphError> {
        let node_id = self.graph().new_gram(self.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn unfold(&self, size: (usize, usize), stride: (usize, usize)) -> Result<Var, GraphError> {
        let node_id = self.graph().new_unfold(self.node_id(), size, stride, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn upsample_nearest(&self, scale: usize) -> Result<Var, GraphError> {
        let node_id = self.graph().new_upsample_nearest(self.node_id(), scale, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn scaled(&self, factor: f32) -> Result<Var, GraphError> {
        let node_id = self.graph().new_scalar_multiply(self.node_id(), factor, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }
}
