/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 训练会话的端到端行为：单步更新、有限性闸门、停止句柄与入口校验
 */

use descreen::Tensor;
use descreen::data::{Batch, Sample, TensorDataset};
use descreen::models::CoarseNet;
use descreen::nn::{Forward, Graph, Module, Var};
use descreen::train::{TrainConfig, TrainError, TrainingSession};
use rand::SeedableRng;
use rand::rngs::StdRng;

const SIZE: (usize, usize) = (16, 16);
const BASE_CHANNELS: usize = 2;

fn tiny_config() -> TrainConfig {
    TrainConfig {
        batch_size: 2,
        epochs: 1,
        learning_rate: 1e-3,
        ..TrainConfig::default()
    }
}

fn random_batch(seed: u64) -> Batch {
    let mut rng = StdRng::seed_from_u64(seed);
    let (h, w) = SIZE;
    Batch {
        x: Tensor::new_random(0.0, 1.0, &[2, 3, h, w], &mut rng),
        y_descreen: Tensor::new_random(0.0, 1.0, &[2, 3, h, w], &mut rng),
        y_edge: Tensor::new_random(0.05, 0.95, &[2, 1, h, w], &mut rng),
    }
}

fn parameter_values(params: &[Var]) -> Vec<Vec<f32>> {
    params
        .iter()
        .map(|p| p.value().unwrap().data_as_slice().to_vec())
        .collect()
}

fn any_changed(before: &[Vec<f32>], after: &[Vec<f32>]) -> bool {
    before.iter().zip(after.iter()).any(|(b, a)| b != a)
}

#[test]
fn test_train_step_updates_every_trainable_network() {
    let mut session = TrainingSession::new(tiny_config(), SIZE, BASE_CHANNELS, 11).unwrap();
    let batch = random_batch(1);

    let before = [
        parameter_values(&session.coarse_net().parameters()),
        parameter_values(&session.edge_net().parameters()),
        parameter_values(&session.details_net().parameters()),
        parameter_values(&session.disc_one().parameters()),
        parameter_values(&session.disc_two().parameters()),
    ];
    let frozen_before: Vec<Vec<f32>> = session
        .segmentation()
        .frozen_weights()
        .iter()
        .map(|w| w.value().unwrap().data_as_slice().to_vec())
        .collect();

    let losses = session.train_step(&batch).unwrap();
    for value in [
        losses.coarse,
        losses.edge,
        losses.details,
        losses.disc_one,
        losses.disc_two,
    ] {
        assert!(value.is_finite());
        assert!(value >= 0.0);
    }

    let after = [
        parameter_values(&session.coarse_net().parameters()),
        parameter_values(&session.edge_net().parameters()),
        parameter_values(&session.details_net().parameters()),
        parameter_values(&session.disc_one().parameters()),
        parameter_values(&session.disc_two().parameters()),
    ];
    for (net_before, net_after) in before.iter().zip(after.iter()) {
        assert!(any_changed(net_before, net_after));
    }

    // 分割模块是冻结协作者：一整步训练后权重必须逐位不变
    let frozen_after: Vec<Vec<f32>> = session
        .segmentation()
        .frozen_weights()
        .iter()
        .map(|w| w.value().unwrap().data_as_slice().to_vec())
        .collect();
    assert_eq!(frozen_before, frozen_after);
}

#[test]
fn test_consecutive_steps_keep_losses_finite() {
    let mut session = TrainingSession::new(tiny_config(), SIZE, BASE_CHANNELS, 13).unwrap();
    for step in 0..3 {
        let losses = session.train_step(&random_batch(step)).unwrap();
        assert!(losses.details.is_finite());
        assert!(losses.coarse.is_finite());
    }
}

#[test]
fn test_non_finite_loss_aborts_before_any_update() {
    let mut session = TrainingSession::new(tiny_config(), SIZE, BASE_CHANNELS, 17).unwrap();
    let before = [
        parameter_values(&session.coarse_net().parameters()),
        parameter_values(&session.edge_net().parameters()),
        parameter_values(&session.details_net().parameters()),
        parameter_values(&session.disc_one().parameters()),
        parameter_values(&session.disc_two().parameters()),
    ];

    let (h, w) = SIZE;
    let mut poisoned = random_batch(3);
    poisoned.x = Tensor::full(f32::NAN, &[2, 3, h, w]);

    match session.train_step(&poisoned) {
        Err(TrainError::NonFiniteLoss { .. }) => {}
        other => panic!("期望NonFiniteLoss，得到{:?}", other.map(|l| l.coarse)),
    }

    // 整步中止：五个网络的参数都必须原样
    let after = [
        parameter_values(&session.coarse_net().parameters()),
        parameter_values(&session.edge_net().parameters()),
        parameter_values(&session.details_net().parameters()),
        parameter_values(&session.disc_one().parameters()),
        parameter_values(&session.disc_two().parameters()),
    ];
    assert_eq!(before, after);
}

#[test]
fn test_stop_request_exits_at_step_boundary() {
    let mut session = TrainingSession::new(tiny_config(), SIZE, BASE_CHANNELS, 19).unwrap();
    let (h, w) = SIZE;
    let mut rng = StdRng::seed_from_u64(5);
    let sample = Sample::new(
        Tensor::new_random(0.0, 1.0, &[3, h, w], &mut rng),
        Tensor::new_random(0.0, 1.0, &[3, h, w], &mut rng),
        Tensor::new_random(0.05, 0.95, &[1, h, w], &mut rng),
    )
    .unwrap();
    let dataset = TensorDataset::new(vec![sample.clone(), sample]).unwrap();

    let handle = session.stop_handle();
    handle.store(true, std::sync::atomic::Ordering::SeqCst);

    // 开始前已请求停止：不执行任何训练步
    let history = session.train(&dataset, 23).unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_wrong_channel_count_is_rejected_before_wiring() {
    let graph = Graph::new();
    let mut rng = StdRng::seed_from_u64(1);
    let net = CoarseNet::new(&graph, BASE_CHANNELS, &mut rng).unwrap();
    let x = Var::input(&graph, &[1, 4, 16, 16], "x").unwrap();
    assert!(net.forward(&x).is_err());
}

#[test]
fn test_indivisible_spatial_size_is_rejected() {
    let graph = Graph::new();
    let mut rng = StdRng::seed_from_u64(1);
    let net = CoarseNet::new(&graph, BASE_CHANNELS, &mut rng).unwrap();
    let x = Var::input(&graph, &[1, 3, 18, 18], "x").unwrap();
    assert!(net.forward(&x).is_err());
}
