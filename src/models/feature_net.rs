use super::{LEAKY_SLOPE, validate_input_channels};
use crate::nn::{Conv2d, Graph, GraphError, Module, NodeId, Var, VarActivationOps};
use std::cell::RefCell;

/// FeatureNet：冻结的五级卷积金字塔，风格损失的特征提取器
///
/// 顶替原实现中预训练的VGG16-BN特征栈：五个阶段的激活依次是
/// 全分辨率、1/2、1/4、1/8、1/16，通道数c、2c、4c、8c、8c。
/// 权重由种子确定性生成的Input常量承载。
///
/// 同一个输入节点的五级特征在多个损失间共享：按输入NodeId缓存接线结果，
/// 重复调用`features`不会重复建节点。
pub struct FeatureNet {
    stages: Vec<Conv2d>,
    wiring: RefCell<std::collections::HashMap<NodeId, Vec<Var>>>,
}

impl FeatureNet {
    pub const IN_CHANNELS: usize = 3;
    pub const NUM_STAGES: usize = 5;

    pub fn new(graph: &Graph, base_channels: usize, seed: u64) -> Result<Self, GraphError> {
        let c = base_channels;
        let configs = [
            (3, c, (1, 1)),
            (c, 2 * c, (2, 2)),
            (2 * c, 4 * c, (2, 2)),
            (4 * c, 8 * c, (2, 2)),
            (8 * c, 8 * c, (2, 2)),
        ];
        let mut stages = Vec::with_capacity(configs.len());
        for (i, (cin, cout, stride)) in configs.into_iter().enumerate() {
            stages.push(Conv2d::new_frozen(
                graph,
                &format!("feature_stage{}", i + 1),
                cin,
                cout,
                (3, 3),
                stride,
                (1, 1),
                seed + i as u64,
            )?);
        }
        Ok(Self {
            stages,
            wiring: RefCell::new(std::collections::HashMap::new()),
        })
    }

    /// 输入的五级特征激活（从浅到深）
    pub fn features(&self, x: &Var) -> Result<Vec<Var>, GraphError> {
        if let Some(cached) = self.wiring.borrow().get(&x.node_id()) {
            return Ok(cached.clone());
        }

        validate_input_channels(x, Self::IN_CHANNELS, "FeatureNet")?;
        let mut features = Vec::with_capacity(self.stages.len());
        let mut h = x.clone();
        for stage in &self.stages {
            h = stage.forward(&h)?.leaky_relu(LEAKY_SLOPE)?;
            features.push(h.clone());
        }
        self.wiring
            .borrow_mut()
            .insert(x.node_id(), features.clone());
        Ok(features)
    }
}

impl Module for FeatureNet {
    fn parameters(&self) -> Vec<Var> {
        Vec::new()
    }
}
