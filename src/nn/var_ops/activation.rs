use crate::nn::graph::GraphError;
use crate::nn::var::Var;

/// 激活函数算子
pub trait VarActivationOps {
    /// LeakyReLU：`max(x, alpha·x)`
    fn leaky_relu(&self, alpha: f32) -> Result<Var, GraphError>;

    fn sigmoid(&self) -> Result<Var, GraphError>;

    fn tanh(&self) -> Result<Var, GraphError>;

    /// 逐像素通道Softmax（分割解码的类别概率输出）
    fn channel_softmax(&self) -> Result<Var, GraphError>;
}

impl VarActivationOps for Var {
    fn leaky_relu(&self, alpha: f32) -> Result<Var, GraphError> {
        let node_id = self.graph().new_leaky_relu(self.node_id(), alpha, None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn sigmoid(&self) -> Result<Var, GraphError> {
        let node_id = self.graph().new_sigmoid(self.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn tanh(&self) -> Result<Var, GraphError> {
        let node_id = self.graph().new_tanh(self.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }

    fn channel_softmax(&self) -> Result<Var, GraphError> {
        let node_id = self.graph().new_channel_softmax(self.node_id(), None)?;
        Ok(Var::from_node(self.graph().clone(), node_id))
    }
}
