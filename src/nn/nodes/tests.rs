use crate::Tensor;
use crate::nn::{Graph, Var, VarActivationOps, VarLossOps, VarStyleOps};
use approx::assert_abs_diff_eq;

fn scalar_param(graph: &Graph, value: f32, name: &str) -> Var {
    Var::parameter(graph, Tensor::full(value, &[1, 1]), name).unwrap()
}

fn zeros_const(graph: &Graph, shape: &[usize], name: &str) -> Var {
    Var::constant(graph, &Tensor::zeros(shape), name).unwrap()
}

#[test]
fn test_concat_backward_slices_upstream_grad() {
    let graph = Graph::new();
    let a = Var::parameter(&graph, Tensor::full(2.0, &[1, 1, 2, 2]), "a").unwrap();
    let b = Var::parameter(&graph, Tensor::full(-3.0, &[1, 2, 2, 2]), "b").unwrap();
    let c = Var::concat(&[&a, &b], Some("c")).unwrap();
    let target = zeros_const(&graph, &[1, 3, 2, 2], "target");
    let loss = c.l1_loss(&target).unwrap();

    loss.forward().unwrap();
    // mean(|c|) = (4·2 + 8·3) / 12
    assert_abs_diff_eq!(loss.item().unwrap(), 32.0 / 12.0, epsilon = 1e-6);

    loss.backward().unwrap();
    let grad_a = a.grad().unwrap().unwrap();
    let grad_b = b.grad().unwrap().unwrap();
    assert_eq!(grad_a.shape(), &[1, 1, 2, 2]);
    assert_eq!(grad_b.shape(), &[1, 2, 2, 2]);
    // dL/dc = sign(c)/12，按通道区间切回各父节点
    assert_abs_diff_eq!(grad_a[[0, 0, 0, 0]], 1.0 / 12.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grad_b[[0, 1, 1, 1]], -1.0 / 12.0, epsilon = 1e-6);
}

#[test]
fn test_unfold_backward_scatters_overlap_counts() {
    let graph = Graph::new();
    let x = Var::parameter(&graph, Tensor::ones(&[1, 1, 3, 3]), "x").unwrap();
    let patches = x.unfold((2, 2), (1, 1)).unwrap();
    assert_eq!(patches.shape().unwrap(), vec![1, 1, 4, 2, 2]);

    let target = zeros_const(&graph, &[1, 1, 4, 2, 2], "target");
    let loss = patches.mse_loss_sum(&target).unwrap();
    loss.forward().unwrap();
    // 4个2x2全1patch的平方和
    assert_abs_diff_eq!(loss.item().unwrap(), 16.0, epsilon = 1e-6);

    loss.backward().unwrap();
    let grad = x.grad().unwrap().unwrap();
    // dL/d(patch元素) = 2，散射回x时每个位置累加其被滑窗覆盖的次数
    let expected = [
        [2.0, 4.0, 2.0],
        [4.0, 8.0, 4.0],
        [2.0, 4.0, 2.0],
    ];
    for (h, row) in expected.iter().enumerate() {
        for (w, &e) in row.iter().enumerate() {
            assert_abs_diff_eq!(grad[[0, 0, h, w]], e, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_gram_value_and_backward() {
    let graph = Graph::new();
    let x = Var::parameter(&graph, Tensor::new(&[1.0, 2.0], &[1, 1, 1, 2]), "x").unwrap();
    let gram = x.gram().unwrap();
    assert_eq!(gram.shape().unwrap(), vec![1, 1]);

    let target = zeros_const(&graph, &[1, 1], "target");
    let loss = gram.l1_loss(&target).unwrap();
    loss.forward().unwrap();
    // F = [1, 2]，G = F·Fᵀ/2 = 5/2
    assert_abs_diff_eq!(loss.item().unwrap(), 2.5, epsilon = 1e-6);

    loss.backward().unwrap();
    let grad = x.grad().unwrap().unwrap();
    // dL/dG = 1，dL/dF = (U+Uᵀ)·F/2 = F
    assert_abs_diff_eq!(grad[[0, 0, 0, 0]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(grad[[0, 0, 0, 1]], 2.0, epsilon = 1e-6);
}

#[test]
fn test_gram_is_symmetric() {
    let graph = Graph::new();
    let x = Var::parameter(
        &graph,
        Tensor::new(&[1.0, -2.0, 0.5, 3.0, 4.0, -1.0, 2.0, 0.0], &[1, 2, 2, 2]),
        "x",
    )
    .unwrap();
    let gram = x.gram().unwrap();
    gram.forward().unwrap();
    let g = gram.value().unwrap();
    assert_eq!(g.shape(), &[2, 2]);
    assert_abs_diff_eq!(g[[0, 1]], g[[1, 0]], epsilon = 1e-6);
}

#[test]
fn test_conv2d_forward_and_both_grads() {
    let graph = Graph::new();
    let x = Var::parameter(
        &graph,
        Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]),
        "x",
    )
    .unwrap();
    let kernel = Var::parameter(&graph, Tensor::full(2.0, &[1, 1, 1, 1]), "kernel").unwrap();
    let y_id = graph
        .new_conv2d(x.node_id(), kernel.node_id(), (1, 1), (0, 0), Some("y"))
        .unwrap();
    let y = Var::from_node(graph.clone(), y_id);

    let target = zeros_const(&graph, &[1, 1, 2, 2], "target");
    let loss = y.mse_loss_sum(&target).unwrap();
    loss.forward().unwrap();
    // y = 2x，Σy² = 4·(1+4+9+16) = 120
    assert_abs_diff_eq!(loss.item().unwrap(), 120.0, epsilon = 1e-4);

    loss.backward().unwrap();
    // dL/dy = 2y = 4x；dL/dx = dL/dy·k = 8x
    let grad_x = x.grad().unwrap().unwrap();
    assert_abs_diff_eq!(grad_x[[0, 0, 0, 0]], 8.0, epsilon = 1e-4);
    assert_abs_diff_eq!(grad_x[[0, 0, 1, 1]], 32.0, epsilon = 1e-4);
    // dL/dk = Σ dL/dy·x = 4Σx² = 120
    let grad_k = kernel.grad().unwrap().unwrap();
    assert_abs_diff_eq!(grad_k[[0, 0, 0, 0]], 120.0, epsilon = 1e-4);
}

#[test]
fn test_conv2d_with_padding_keeps_spatial_size() {
    let graph = Graph::new();
    let x = Var::parameter(&graph, Tensor::ones(&[2, 3, 4, 4]), "x").unwrap();
    let kernel = Var::parameter(&graph, Tensor::ones(&[5, 3, 3, 3]), "kernel").unwrap();
    let y_id = graph
        .new_conv2d(x.node_id(), kernel.node_id(), (1, 1), (1, 1), Some("y"))
        .unwrap();
    let y = Var::from_node(graph.clone(), y_id);
    assert_eq!(y.shape().unwrap(), vec![2, 5, 4, 4]);

    y.forward().unwrap();
    let value = y.value().unwrap();
    // 中心位置：3×3×3个1相乘累加
    assert_abs_diff_eq!(value[[0, 0, 1, 1]], 27.0, epsilon = 1e-4);
    // 角落位置：填充后只剩2×2×3个有效元素
    assert_abs_diff_eq!(value[[0, 0, 0, 0]], 12.0, epsilon = 1e-4);
}

#[test]
fn test_detach_blocks_gradient() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 3.0, "a");
    let detached = a.detach().unwrap();
    let target = zeros_const(&graph, &[1, 1], "target");
    let loss = detached.l1_loss(&target).unwrap();

    loss.forward().unwrap();
    assert_abs_diff_eq!(loss.item().unwrap(), 3.0, epsilon = 1e-6);

    loss.backward().unwrap();
    assert!(a.grad().unwrap().is_none());
}

#[test]
fn test_same_var_attached_and_detached_in_one_loss() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 2.0, "a");
    // loss = mean((a - detach(a)·0.5)²) = (a - 1)²，只对"附着"的那条路径求导
    let half = a.detach().unwrap().scaled(0.5).unwrap();
    let loss = a.mse_loss(&half).unwrap();

    loss.forward().unwrap();
    assert_abs_diff_eq!(loss.item().unwrap(), 1.0, epsilon = 1e-6);

    loss.backward().unwrap();
    let grad = a.grad().unwrap().unwrap();
    // d/da (a - 1)² = 2(a - 1) = 2
    assert_abs_diff_eq!(grad[[0, 0]], 2.0, epsilon = 1e-6);
}

#[test]
fn test_weighted_loss_sum_scales_gradients() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 2.0, "a");
    let target = zeros_const(&graph, &[1, 1], "target");
    let l1 = a.l1_loss(&target).unwrap().scaled(2.0).unwrap();
    let mse = a.mse_loss(&target).unwrap().scaled(3.0).unwrap();
    let total = &l1 + &mse;

    total.forward().unwrap();
    // 2·|2| + 3·2² = 16
    assert_abs_diff_eq!(total.item().unwrap(), 16.0, epsilon = 1e-6);

    total.backward().unwrap();
    let grad = a.grad().unwrap().unwrap();
    // 2·sign(2) + 3·2·2 = 14
    assert_abs_diff_eq!(grad[[0, 0]], 14.0, epsilon = 1e-6);
}

#[test]
fn test_bce_loss_value_and_grad_direction() {
    let graph = Graph::new();
    let logits = scalar_param(&graph, 0.0, "logits");
    let p = logits.sigmoid().unwrap();
    let target = Var::constant(&graph, &Tensor::ones(&[1, 1]), "target").unwrap();
    let loss = p.bce_loss(&target).unwrap();

    loss.forward().unwrap();
    // p = 0.5，-ln(0.5)
    assert_abs_diff_eq!(loss.item().unwrap(), 0.5f32.ln().abs(), epsilon = 1e-5);

    loss.backward().unwrap();
    // dL/dlogits = p - t = -0.5：目标为1时应把logits往上推
    let grad = logits.grad().unwrap().unwrap();
    assert_abs_diff_eq!(grad[[0, 0]], -0.5, epsilon = 1e-5);
}

#[test]
fn test_parameter_grads_accumulate_until_cleared() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 2.0, "a");
    let target = zeros_const(&graph, &[1, 1], "target");
    let loss = a.l1_loss(&target).unwrap();

    loss.forward().unwrap();
    loss.backward_retain().unwrap();
    loss.backward_retain().unwrap();
    // Parameter的梯度跨backward累加
    assert_abs_diff_eq!(a.grad().unwrap().unwrap()[[0, 0]], 2.0, epsilon = 1e-6);

    a.clear_grad().unwrap();
    assert!(a.grad().unwrap().is_none());
}

#[test]
fn test_forward_recomputes_after_input_change() {
    let graph = Graph::new();
    let x = Var::input(&graph, &[1, 1], "x").unwrap();
    let a = scalar_param(&graph, 3.0, "a");
    let y = &x + &a;

    x.set_value(&Tensor::full(1.0, &[1, 1])).unwrap();
    y.forward().unwrap();
    assert_abs_diff_eq!(y.value().unwrap()[[0, 0]], 4.0, epsilon = 1e-6);

    x.set_value(&Tensor::full(10.0, &[1, 1])).unwrap();
    y.forward().unwrap();
    assert_abs_diff_eq!(y.value().unwrap()[[0, 0]], 13.0, epsilon = 1e-6);
}

#[test]
fn test_upsample_nearest_forward_backward() {
    let graph = Graph::new();
    let x = Var::parameter(&graph, Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]), "x").unwrap();
    let up = x.upsample_nearest(2).unwrap();
    assert_eq!(up.shape().unwrap(), vec![1, 1, 4, 4]);

    let target = zeros_const(&graph, &[1, 1, 4, 4], "target");
    let loss = up.mse_loss_sum(&target).unwrap();
    loss.forward().unwrap();
    // 每个输入元素被复制4次：4·(1+4+9+16)
    assert_abs_diff_eq!(loss.item().unwrap(), 120.0, epsilon = 1e-5);

    loss.backward().unwrap();
    // 块内梯度求和：dL/dx = 4·2x = 8x
    let grad = x.grad().unwrap().unwrap();
    assert_abs_diff_eq!(grad[[0, 0, 0, 0]], 8.0, epsilon = 1e-5);
    assert_abs_diff_eq!(grad[[0, 0, 1, 1]], 32.0, epsilon = 1e-5);
}

#[test]
fn test_channel_softmax_sums_to_one() {
    let graph = Graph::new();
    let x = Var::parameter(
        &graph,
        Tensor::new(&[1.0, -2.0, 0.5, 3.0, 4.0, -1.0, 2.0, 0.0], &[1, 4, 1, 2]),
        "x",
    )
    .unwrap();
    let probs = x.channel_softmax().unwrap();
    probs.forward().unwrap();
    let p = probs.value().unwrap();
    for wi in 0..2 {
        let sum: f32 = (0..4).map(|ci| p[[0, ci, 0, wi]]).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn test_concat_rejects_vars_from_different_graphs() {
    let g1 = Graph::new();
    let g2 = Graph::new();
    assert!(g1.same_graph(&g1.clone()));
    assert!(!g1.same_graph(&g2));

    let a = Var::parameter(&g1, Tensor::ones(&[1, 1, 2, 2]), "a").unwrap();
    let b = Var::parameter(&g2, Tensor::ones(&[1, 1, 2, 2]), "b").unwrap();
    assert!(Var::concat(&[&a, &b], None).is_err());
}

#[test]
fn test_backward_without_retain_releases_intermediate_values() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 2.0, "a");
    let target = zeros_const(&graph, &[1, 1], "target");
    let doubled = a.scaled(2.0).unwrap();
    let loss = doubled.l1_loss(&target).unwrap();

    loss.forward().unwrap();
    assert!(doubled.has_value().unwrap());

    loss.backward_retain().unwrap();
    assert!(doubled.has_value().unwrap());

    // 非retain的backward释放中间值，叶子节点的值保留
    loss.backward().unwrap();
    assert!(!doubled.has_value().unwrap());
    assert!(a.has_value().unwrap());
}

#[test]
fn test_graph_tracks_parameter_ids_in_creation_order() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 1.0, "a");
    let _c = zeros_const(&graph, &[1, 1], "c");
    let b = scalar_param(&graph, 2.0, "b");
    assert_eq!(graph.parameter_ids(), vec![a.node_id(), b.node_id()]);
}

#[test]
fn test_duplicate_parameter_name_is_rejected() {
    let graph = Graph::new();
    let _a = scalar_param(&graph, 1.0, "w");
    assert!(Var::parameter(&graph, Tensor::full(1.0, &[1, 1]), "w").is_err());
}

#[test]
fn test_op_node_names_dedupe_automatically() {
    let graph = Graph::new();
    let a = scalar_param(&graph, 1.0, "a");
    let b = scalar_param(&graph, 2.0, "b");
    let s1 = a.try_add(&b, Some("sum")).unwrap();
    let s2 = a.try_add(&b, Some("sum")).unwrap();
    assert_eq!(s1.name().unwrap(), "sum");
    assert_ne!(s2.name().unwrap(), "sum");
}
