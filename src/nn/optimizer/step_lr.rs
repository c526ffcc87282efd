/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : StepLR学习率调度器：每隔step_size个epoch把学习率乘以gamma
 */

use super::Optimizer;

pub struct StepLR {
    step_size: usize,
    gamma: f32,
    epoch: usize,
}

impl StepLR {
    /// `step_size`为0时视为1（每个epoch都衰减）
    pub fn new(step_size: usize, gamma: f32) -> Self {
        Self {
            step_size: step_size.max(1),
            gamma,
            epoch: 0,
        }
    }

    /// 每个epoch结束时调用一次
    pub fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.epoch += 1;
        if self.epoch % self.step_size == 0 {
            optimizer.set_learning_rate(optimizer.learning_rate() * self.gamma);
        }
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Adam, Graph, Optimizer};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lr_decays_every_epoch_and_never_increases() {
        let graph = Graph::new();
        let mut optimizer = Adam::new(&graph, &[], 1.0);
        let mut scheduler = StepLR::new(1, 0.5);

        let mut previous = optimizer.learning_rate();
        for epoch in 1..=4 {
            scheduler.step(&mut optimizer);
            let current = optimizer.learning_rate();
            assert!(current <= previous);
            assert_abs_diff_eq!(current, 0.5f32.powi(epoch), epsilon = 1e-6);
            previous = current;
        }
        assert_eq!(scheduler.epoch(), 4);
    }

    #[test]
    fn test_step_size_gates_the_decay() {
        let graph = Graph::new();
        let mut optimizer = Adam::new(&graph, &[], 1.0);
        let mut scheduler = StepLR::new(3, 0.1);

        scheduler.step(&mut optimizer);
        scheduler.step(&mut optimizer);
        assert_abs_diff_eq!(optimizer.learning_rate(), 1.0);
        scheduler.step(&mut optimizer);
        assert_abs_diff_eq!(optimizer.learning_rate(), 0.1);
    }
}
