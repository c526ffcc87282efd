/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 三个复合损失的数值行为：恒等输入归零、BCE基准值、Gram恒等
 */

use descreen::Tensor;
use descreen::losses::{CoarseLoss, DetailsLoss, EdgeLoss};
use descreen::models::FeatureNet;
use descreen::nn::{Graph, Var, VarLossOps, VarStyleOps};

const BASE_CHANNELS: usize = 2;

fn image_input(graph: &Graph, name: &str, value: f32) -> Var {
    let var = Var::input(graph, &[1, 3, 16, 16], name).unwrap();
    var.set_value(&Tensor::full(value, &[1, 3, 16, 16])).unwrap();
    var
}

#[test]
fn test_coarse_loss_is_zero_for_identical_images() {
    let graph = Graph::new();
    let feature_net = FeatureNet::new(&graph, BASE_CHANNELS, 7).unwrap();
    let prediction = image_input(&graph, "prediction", 0.3);
    let target = image_input(&graph, "target", 0.3);

    let loss = CoarseLoss::new()
        .forward(&feature_net, &prediction, &target)
        .unwrap();
    loss.forward().unwrap();

    // L1项为0；两侧特征塔权重相同、输入相同，每级Gram差也为0
    assert!(loss.item().unwrap().abs() < 1e-5);
}

#[test]
fn test_coarse_loss_is_positive_for_different_images() {
    let graph = Graph::new();
    let feature_net = FeatureNet::new(&graph, BASE_CHANNELS, 7).unwrap();
    let prediction = image_input(&graph, "prediction", 0.9);
    let target = image_input(&graph, "target", 0.1);

    let loss = CoarseLoss::new()
        .forward(&feature_net, &prediction, &target)
        .unwrap();
    loss.forward().unwrap();

    let value = loss.item().unwrap();
    assert!(value.is_finite());
    // 仅L1项就已是 50 * |0.9 - 0.1| = 40
    assert!(value >= 39.0);
}

#[test]
fn test_edge_loss_matches_bce_reference_value() {
    let graph = Graph::new();
    let prediction = Var::input(&graph, &[1, 1, 4, 4], "edge_prediction").unwrap();
    let target = Var::input(&graph, &[1, 1, 4, 4], "edge_target").unwrap();
    prediction
        .set_value(&Tensor::full(0.5, &[1, 1, 4, 4]))
        .unwrap();
    target.set_value(&Tensor::ones(&[1, 1, 4, 4])).unwrap();

    let loss = EdgeLoss::new().forward(&prediction, &target).unwrap();
    loss.forward().unwrap();

    // 全1目标、预测恒为0.5：逐元素BCE取平均 = -ln(0.5) = ln2
    let expected = std::f32::consts::LN_2;
    assert!((loss.item().unwrap() - expected).abs() < 1e-4);
}

#[test]
fn test_details_loss_reduces_to_edge_term_for_identical_images() {
    let graph = Graph::new();
    let feature_net = FeatureNet::new(&graph, BASE_CHANNELS, 7).unwrap();
    let details = image_input(&graph, "details", 0.4);
    let target = image_input(&graph, "details_target", 0.4);

    let details_edges = Var::input(&graph, &[1, 1, 16, 16], "details_edges").unwrap();
    let edge_target = Var::input(&graph, &[1, 1, 16, 16], "details_edge_target").unwrap();
    details_edges
        .set_value(&Tensor::full(0.5, &[1, 1, 16, 16]))
        .unwrap();
    edge_target.set_value(&Tensor::ones(&[1, 1, 16, 16])).unwrap();

    // 判别器评分恒为1：对抗项 MSE(score, 1) = 0
    let score = Var::input(&graph, &[1, 1, 2, 2], "score").unwrap();
    score.set_value(&Tensor::ones(&[1, 1, 2, 2])).unwrap();

    let loss = DetailsLoss::new()
        .forward(&feature_net, &details, &target, &details_edges, &edge_target, &score)
        .unwrap();
    loss.forward().unwrap();

    // L1与分块Gram项都为0，只剩 0.1 * ln2 的边缘项
    let expected = 0.1 * std::f32::consts::LN_2;
    assert!((loss.item().unwrap() - expected).abs() < 1e-4);
}

#[test]
fn test_gram_mse_against_own_detached_copy_is_zero() {
    let graph = Graph::new();
    let features = Var::input(&graph, &[1, 2, 4, 4], "features").unwrap();
    features
        .set_value(&Tensor::new_random(-1.0, 1.0, &[1, 2, 4, 4], &mut rand_rng(42)))
        .unwrap();

    let gram = features.gram().unwrap();
    let loss = gram.mse_loss(&gram.detach().unwrap()).unwrap();
    loss.forward().unwrap();

    assert_eq!(loss.item().unwrap(), 0.0);
}

#[test]
fn test_patch_unfold_is_deterministic() {
    let graph = Graph::new();
    let features = Var::input(&graph, &[1, 2, 28, 28], "features").unwrap();
    let value = Tensor::new_random(-1.0, 1.0, &[1, 2, 28, 28], &mut rand_rng(7));
    features.set_value(&value).unwrap();

    let patch_gram = features.unfold((14, 14), (14, 14)).unwrap().gram().unwrap();
    patch_gram.forward().unwrap();
    let first = patch_gram.value().unwrap();

    // 重新喂同样的值再前向，结果必须逐位一致
    features.set_value(&value).unwrap();
    patch_gram.forward().unwrap();
    let second = patch_gram.value().unwrap();

    assert_eq!(first.data_as_slice(), second.data_as_slice());
}

fn rand_rng(seed: u64) -> rand::rngs::StdRng {
    use rand::SeedableRng;
    rand::rngs::StdRng::seed_from_u64(seed)
}
