use crate::nn::{GraphError, NodeId, Var, VarLossOps};
use std::cell::RefCell;
use std::collections::HashMap;

/// 边缘损失：预测边缘图与目标边缘图的逐元素BCE取平均
pub struct EdgeLoss {
    wired: RefCell<HashMap<(NodeId, NodeId), Var>>,
}

impl Default for EdgeLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeLoss {
    pub fn new() -> Self {
        Self {
            wired: RefCell::new(HashMap::new()),
        }
    }

    pub fn forward(&self, prediction: &Var, target: &Var) -> Result<Var, GraphError> {
        let key = (prediction.node_id(), target.node_id());
        if let Some(wired) = self.wired.borrow().get(&key) {
            return Ok(wired.clone());
        }
        let loss = prediction.bce_loss(target)?;
        self.wired.borrow_mut().insert(key, loss.clone());
        Ok(loss)
    }
}
