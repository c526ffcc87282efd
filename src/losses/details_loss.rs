use crate::models::FeatureNet;
use crate::nn::{GraphError, NodeId, Var, VarLossOps, VarStyleOps};
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::collections::HashMap;

/// 分块Gram的滑窗尺寸（不重叠）
const PATCH_SIZE: usize = 14;

/// 细节损失：
/// `w1·L1 + w2·BCE(edge(details), y_edge) + w3·Σ_i MSE_mean(PatchGram_i(pred), PatchGram_i(y)) + w4·MSE(D(residual), 1)`
///
/// - 分块Gram只在空间尺寸不小于滑窗的特征级上计算；
/// - 目标侧的Gram分支detach；
/// - 对抗项的全1目标是一次性创建的常量节点。
pub struct DetailsLoss {
    w1: f32,
    w2: f32,
    w3: f32,
    w4: f32,
    wired: RefCell<HashMap<NodeId, Var>>,
}

impl Default for DetailsLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailsLoss {
    pub fn new() -> Self {
        Self::with_weights(100.0, 0.1, 0.5, 1.0)
    }

    pub fn with_weights(w1: f32, w2: f32, w3: f32, w4: f32) -> Self {
        Self {
            w1,
            w2,
            w3,
            w4,
            wired: RefCell::new(HashMap::new()),
        }
    }

    /// - `details`: 最终重建（细节残差 + 粗糙重建）
    /// - `target`: y_descreen
    /// - `details_edges`: EdgeNet(details)
    /// - `edge_target`: y_edge
    /// - `adversarial_score`: 一号判别器对（附着的）细节残差的评分图
    pub fn forward(
        &self,
        feature_net: &FeatureNet,
        details: &Var,
        target: &Var,
        details_edges: &Var,
        edge_target: &Var,
        adversarial_score: &Var,
    ) -> Result<Var, GraphError> {
        let key = details.node_id();
        if let Some(wired) = self.wired.borrow().get(&key) {
            return Ok(wired.clone());
        }

        let l1_term = details.l1_loss(target)?.scaled(self.w1)?;
        let edge_term = details_edges.bce_loss(edge_target)?.scaled(self.w2)?;

        let prediction_features = feature_net.features(details)?;
        let target_features = feature_net.features(target)?;
        let mut style_term: Option<Var> = None;
        for (pred_feat, target_feat) in prediction_features.iter().zip(target_features.iter()) {
            let spatial = pred_feat.shape()?;
            // 比滑窗还小的特征级没有patch可切
            if spatial[2] < PATCH_SIZE || spatial[3] < PATCH_SIZE {
                continue;
            }
            let pred_gram = patch_gram(pred_feat)?;
            let target_gram = patch_gram(target_feat)?.detach()?;
            let stage = pred_gram.mse_loss(&target_gram)?;
            style_term = Some(match style_term {
                Some(acc) => acc.try_add(&stage, None)?,
                None => stage,
            });
        }

        let adversarial_target = Var::constant(
            adversarial_score.graph(),
            &Tensor::ones(&adversarial_score.shape()?),
            &format!("details_adv_target_{}", adversarial_score.node_id()),
        )?;
        let adversarial_term = adversarial_score
            .mse_loss(&adversarial_target)?
            .scaled(self.w4)?;

        let mut loss = l1_term.try_add(&edge_term, None)?;
        if let Some(style) = style_term {
            loss = loss.try_add(&style.scaled(self.w3)?, None)?;
        }
        let loss = loss.try_add(&adversarial_term, Some("details_loss"))?;
        self.wired.borrow_mut().insert(key, loss.clone());
        Ok(loss)
    }
}

/// 不重叠滑窗展开后的Gram矩阵
fn patch_gram(feature: &Var) -> Result<Var, GraphError> {
    feature
        .unfold((PATCH_SIZE, PATCH_SIZE), (PATCH_SIZE, PATCH_SIZE))?
        .gram()
}
