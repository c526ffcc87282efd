/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 参数检查点与分割模块权重文件的读写行为
 */

use descreen::Tensor;
use descreen::data::DataError;
use descreen::models::{CoarseNet, SegmentationModule};
use descreen::nn::{Graph, Module, Var};
use descreen::train::{TrainConfig, TrainingSession};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("descreen_test_{}_{name}", std::process::id()))
}

#[test]
fn test_checkpoint_round_trip_restores_parameters() {
    let graph = Graph::new();
    let mut rng = StdRng::seed_from_u64(3);
    let net = CoarseNet::new(&graph, 2, &mut rng).unwrap();
    let params = net.parameters();

    let saved: Vec<Tensor> = params.iter().map(|p| p.value().unwrap()).collect();
    let path = temp_path("round_trip.dspr");
    graph.save_params(&path).unwrap();

    // 把所有参数清零后再加载，值必须逐位恢复
    for p in &params {
        p.set_value(&Tensor::zeros(&p.shape().unwrap())).unwrap();
    }
    graph.load_params(&path).unwrap();
    for (p, original) in params.iter().zip(saved.iter()) {
        assert_eq!(
            p.value().unwrap().data_as_slice(),
            original.data_as_slice()
        );
    }
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_checkpoint_load_rejects_unknown_parameter_name() {
    // 保存含两个参数的图，再往只有其中一个参数的图里加载
    let source = Graph::new();
    Var::parameter(&source, Tensor::ones(&[2, 2]), "w1").unwrap();
    Var::parameter(&source, Tensor::ones(&[2, 2]), "w2").unwrap();
    let path = temp_path("unknown_param.dspr");
    source.save_params(&path).unwrap();

    let target = Graph::new();
    Var::parameter(&target, Tensor::ones(&[2, 2]), "w1").unwrap();
    assert!(target.load_params(&path).is_err());
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_session_checkpoint_round_trip() {
    let config = TrainConfig {
        batch_size: 1,
        epochs: 1,
        ..TrainConfig::default()
    };
    let mut session = TrainingSession::new(config, (16, 16), 2, 29).unwrap();

    let params = session.coarse_net().parameters();
    let saved: Vec<Tensor> = params.iter().map(|p| p.value().unwrap()).collect();

    let path = temp_path("session.dspr");
    session.save_checkpoint(&path).unwrap();
    for p in &params {
        p.set_value(&Tensor::zeros(&p.shape().unwrap())).unwrap();
    }
    session.load_checkpoint(&path).unwrap();

    let restored = session.coarse_net().parameters();
    for (p, original) in restored.iter().zip(saved.iter()) {
        assert_eq!(
            p.value().unwrap().data_as_slice(),
            original.data_as_slice()
        );
    }
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_segmentation_weights_file_must_exist() {
    let graph = Graph::new();
    let result = SegmentationModule::from_file(&graph, temp_path("no_such_file.dspr"));
    assert!(matches!(result, Err(DataError::FileNotFound(_))));
}
