use crate::nn::graph::GraphError;
use crate::nn::nodes::raw_node::Reduction;
use crate::nn::var::Var;

/// 损失算子。所有损失的输出都是[1, 1]的标量节点。
pub trait VarLossOps {
    /// `mean(|self - target|)`
    fn l1_loss(&self, target: &Var) -> Result<Var, GraphError>;

    /// `mean((self - target)²)`
    fn mse_loss(&self, target: &Var) -> Result<Var, GraphError>;

    /// `sum((self - target)²)`（Gram矩阵风格项用）
    fn mse_loss_sum(&self, target: &Var) -> Result<Var, GraphError>;

    /// 二元交叉熵（self应为(0, 1)内的概率）
    fn bce_loss(&self, target: &Var) -> Result<Var, GraphError>;
}

impl VarLossOps for Var {
    fn l1_loss(&self, target: &Var) -> Result<Var, GraphError> {
        let node_id = self
            .graph()
            .new_l1_loss(self.node_id(), target.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn mse_loss(&self, target: &Var) -> Result<Var, GraphError> {
        let node_id =
            self.graph()
                .new_mse_loss(self.node_id(), target.node_id(), Reduction::Mean, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn mse_loss_sum(&self, target: &Var) -> Result<Var, GraphError> {
        let node_id =
            self.graph()
                .new_mse_loss(self.node_id(), target.node_id(), Reduction::Sum, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn bce_loss(&self, target: &Var) -> Result<Var, GraphError> {
        let node_id = self
            .graph()
            .new_bce_loss(self.node_id(), target.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }
}
