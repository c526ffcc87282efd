use crate::models::FeatureNet;
use crate::nn::{GraphError, NodeId, Var, VarLossOps, VarStyleOps};
use std::cell::RefCell;
use std::collections::HashMap;

/// 粗糙损失：`w1·L1 + w2·Σ_i weight_vgg[i]·MSE_sum(Gram(feat_i(pred)), Gram(feat_i(y)))`
///
/// 目标侧的Gram分支被detach：目标是常量，它的特征塔不需要回传梯度。
/// 同一对(预测, 目标)只接线一次，重复forward直接复用已建的损失节点。
pub struct CoarseLoss {
    w1: f32,
    w2: f32,
    weight_vgg: [f32; FeatureNet::NUM_STAGES],
    wired: RefCell<HashMap<(NodeId, NodeId), Var>>,
}

impl Default for CoarseLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl CoarseLoss {
    pub fn new() -> Self {
        Self::with_weights(50.0, 1.0, [0.5; FeatureNet::NUM_STAGES])
    }

    pub fn with_weights(w1: f32, w2: f32, weight_vgg: [f32; FeatureNet::NUM_STAGES]) -> Self {
        Self {
            w1,
            w2,
            weight_vgg,
            wired: RefCell::new(HashMap::new()),
        }
    }

    pub fn forward(
        &self,
        feature_net: &FeatureNet,
        prediction: &Var,
        target: &Var,
    ) -> Result<Var, GraphError> {
        let key = (prediction.node_id(), target.node_id());
        if let Some(wired) = self.wired.borrow().get(&key) {
            return Ok(wired.clone());
        }

        let l1_term = prediction.l1_loss(target)?.scaled(self.w1)?;

        let prediction_features = feature_net.features(prediction)?;
        let target_features = feature_net.features(target)?;
        let mut style_term: Option<Var> = None;
        for (i, (pred_feat, target_feat)) in prediction_features
            .iter()
            .zip(target_features.iter())
            .enumerate()
        {
            let pred_gram = pred_feat.gram()?;
            let target_gram = target_feat.gram()?.detach()?;
            let stage = pred_gram
                .mse_loss_sum(&target_gram)?
                .scaled(self.weight_vgg[i])?;
            style_term = Some(match style_term {
                Some(acc) => acc.try_add(&stage, None)?,
                None => stage,
            });
        }

        let loss = match style_term {
            Some(style) => l1_term.try_add(&style.scaled(self.w2)?, Some("coarse_loss"))?,
            None => l1_term,
        };
        self.wired.borrow_mut().insert(key, loss.clone());
        Ok(loss)
    }
}
