/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 训练编排：配置、错误与训练会话
 */

mod config;
mod session;

pub use config::TrainConfig;
pub use session::{StepLosses, TrainingSession};

use crate::data::DataError;
use crate::nn::GraphError;
use thiserror::Error;

/// 训练过程错误
#[derive(Debug, Error)]
pub enum TrainError {
    /// 任一损失出现NaN/Inf时整步中止，五个优化器都不执行更新
    #[error("损失[{name}]出现非有限值：{value}，本步中止且未更新任何参数")]
    NonFiniteLoss { name: &'static str, value: f32 },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Data(#[from] DataError),
}
