/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 优化器与学习率调度器
 */

mod adam;
mod step_lr;

pub use adam::Adam;
pub use step_lr::StepLR;

use crate::nn::graph::GraphError;

/// 优化器接口。每个网络持有自己的优化器实例，只更新自己名下的参数。
pub trait Optimizer {
    /// 清零所有受管参数的梯度
    fn zero_grad(&mut self) -> Result<(), GraphError>;

    /// 按当前梯度更新所有受管参数
    fn step(&mut self) -> Result<(), GraphError>;

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, learning_rate: f32);

    /// 重置内部状态（动量、步数计数等）
    fn reset(&mut self);
}
