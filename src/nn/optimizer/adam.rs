/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Adam优化器（一阶/二阶动量 + 偏差校正）
 */

use super::Optimizer;
use crate::nn::graph::{Graph, GraphError};
use crate::nn::nodes::NodeId;
use crate::nn::var::Var;
use crate::tensor::Tensor;
use std::collections::HashMap;

const DEFAULT_BETA_1: f32 = 0.9;
const DEFAULT_BETA_2: f32 = 0.999;
const DEFAULT_EPSILON: f32 = 1e-8;

/// Adam优化器
///
/// 对抗训练中生成器/判别器常用`beta1 = 0.5`，用[`Adam::with_beta_1`]指定。
pub struct Adam {
    graph: Graph,
    params: Vec<NodeId>,
    learning_rate: f32,
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
    /// 已执行的step次数（偏差校正用）
    step_count: u64,
    /// 每个参数的(一阶动量, 二阶动量)
    moments: HashMap<NodeId, (Tensor, Tensor)>,
}

impl Adam {
    pub fn new(graph: &Graph, params: &[Var], learning_rate: f32) -> Self {
        Self {
            graph: graph.clone(),
            params: params.iter().map(Var::node_id).collect(),
            learning_rate,
            beta_1: DEFAULT_BETA_1,
            beta_2: DEFAULT_BETA_2,
            epsilon: DEFAULT_EPSILON,
            step_count: 0,
            moments: HashMap::new(),
        }
    }

    pub fn with_beta_1(graph: &Graph, params: &[Var], learning_rate: f32, beta_1: f32) -> Self {
        let mut optimizer = Self::new(graph, params, learning_rate);
        optimizer.beta_1 = beta_1;
        optimizer
    }
}

impl Optimizer for Adam {
    fn zero_grad(&mut self) -> Result<(), GraphError> {
        for &id in &self.params {
            self.graph.clear_node_grad(id)?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), GraphError> {
        self.step_count += 1;
        let bias_1 = 1.0 - self.beta_1.powi(self.step_count as i32);
        let bias_2 = 1.0 - self.beta_2.powi(self.step_count as i32);

        for &id in &self.params {
            // 本步没有收到梯度的参数跳过（如判别器阶段不更新生成器）
            let Some(grad) = self.graph.node_grad(id)? else {
                continue;
            };
            let value = self.graph.node_value(id)?.ok_or_else(|| {
                GraphError::ComputationError("参数没有值，无法更新".to_string())
            })?;

            let (m, v) = self
                .moments
                .entry(id)
                .or_insert_with(|| (Tensor::zeros(grad.shape()), Tensor::zeros(grad.shape())));
            *m = &(&*m * self.beta_1) + &(&grad * (1.0 - self.beta_1));
            *v = &(&*v * self.beta_2) + &(&(&grad * &grad) * (1.0 - self.beta_2));

            let m_hat = &*m * (1.0 / bias_1);
            let v_hat = &*v * (1.0 / bias_2);
            let denominator = v_hat.map(|x| 1.0 / (x.sqrt() + self.epsilon));
            let update = &(&m_hat * &denominator) * self.learning_rate;

            self.graph.set_node_value(id, &(&value - &update))?;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn reset(&mut self) {
        self.step_count = 0;
        self.moments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::var_ops::VarLossOps;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_step_moves_by_signed_learning_rate() {
        let graph = Graph::new();
        let p = Var::parameter(&graph, Tensor::full(1.0, &[1, 1]), "p").unwrap();
        let target = Var::constant(&graph, &Tensor::zeros(&[1, 1]), "target").unwrap();
        let loss = p.mse_loss(&target).unwrap();

        let mut optimizer = Adam::new(&graph, &[p.clone()], 0.1);
        loss.forward().unwrap();
        loss.backward().unwrap();
        optimizer.step().unwrap();

        // 首步的偏差校正让 m̂ = g、v̂ = g²，更新量 ≈ lr·sign(g)
        assert_abs_diff_eq!(p.value().unwrap().number().unwrap(), 0.9, epsilon = 1e-4);
    }

    #[test]
    fn test_parameter_without_gradient_is_skipped() {
        let graph = Graph::new();
        let p = Var::parameter(&graph, Tensor::full(1.0, &[1, 1]), "p").unwrap();
        let idle = Var::parameter(&graph, Tensor::full(7.0, &[1, 1]), "idle").unwrap();
        let target = Var::constant(&graph, &Tensor::zeros(&[1, 1]), "target").unwrap();
        let loss = p.mse_loss(&target).unwrap();

        let mut optimizer = Adam::new(&graph, &[p.clone(), idle.clone()], 0.1);
        loss.forward().unwrap();
        loss.backward().unwrap();
        optimizer.step().unwrap();

        assert_abs_diff_eq!(idle.value().unwrap().number().unwrap(), 7.0);
        assert!(p.value().unwrap().number().unwrap() < 1.0);
    }

    #[test]
    fn test_zero_grad_clears_accumulated_gradients() {
        let graph = Graph::new();
        let p = Var::parameter(&graph, Tensor::full(1.0, &[1, 1]), "p").unwrap();
        let target = Var::constant(&graph, &Tensor::zeros(&[1, 1]), "target").unwrap();
        let loss = p.mse_loss(&target).unwrap();

        let mut optimizer = Adam::new(&graph, &[p.clone()], 0.1);
        loss.forward().unwrap();
        loss.backward().unwrap();
        assert!(p.grad().unwrap().is_some());

        optimizer.zero_grad().unwrap();
        assert!(p.grad().unwrap().is_none());
    }
}
