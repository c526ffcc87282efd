use super::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_new_and_property() {
    let t = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.dimension(), 2);
    assert_eq!(t.size(), 6);
    assert_eq!(t[[1, 2]], 6.0);
    assert!(t.number().is_none());

    let s = Tensor::new(&[3.5], &[1, 1]);
    assert!(s.is_scalar());
    assert_eq!(s.number(), Some(3.5));
}

#[test]
fn test_elementwise_ops() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let b = Tensor::new(&[0.5, 1.5, -1.0, 2.0], &[2, 2]);
    assert_eq!(&a + &b, Tensor::new(&[1.5, 3.5, 2.0, 6.0], &[2, 2]));
    assert_eq!(&a - &b, Tensor::new(&[0.5, 0.5, 4.0, 2.0], &[2, 2]));
    assert_eq!(&a * &b, Tensor::new(&[0.5, 3.0, -3.0, 8.0], &[2, 2]));
    assert_eq!(&a * 2.0, Tensor::new(&[2.0, 4.0, 6.0, 8.0], &[2, 2]));
    assert_abs_diff_eq!(a.sum_all(), 10.0);
    assert_abs_diff_eq!(a.mean_all(), 2.5);
}

#[test]
#[should_panic(expected = "形状不一致")]
fn test_elementwise_shape_mismatch_panics() {
    let a = Tensor::zeros(&[2, 2]);
    let b = Tensor::zeros(&[2, 3]);
    let _ = &a + &b;
}

#[test]
fn test_mat_mul() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let b = Tensor::new(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0], &[3, 2]);
    let c = a.mat_mul(&b);
    assert_eq!(c, Tensor::new(&[58.0, 64.0, 139.0, 154.0], &[2, 2]));
}

#[test]
fn test_reshape_and_transpose() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let r = a.reshape(&[3, 2]);
    assert_eq!(r.shape(), &[3, 2]);
    assert_eq!(r[[2, 1]], 6.0);

    let t = a.transpose_2d();
    assert_eq!(t.shape(), &[3, 2]);
    assert_eq!(t[[2, 0]], 3.0);
    assert_eq!(t[[2, 1]], 6.0);
}

#[test]
fn test_concat_and_slice_channels() {
    let a = Tensor::ones(&[2, 3, 4, 4]);
    let b = Tensor::zeros(&[2, 1, 4, 4]);
    let c = Tensor::concat_channels(&[&a, &b]);
    assert_eq!(c.shape(), &[2, 4, 4, 4]);
    assert_eq!(c[[0, 2, 3, 3]], 1.0);
    assert_eq!(c[[1, 3, 0, 0]], 0.0);

    let s = c.slice_channels(3, 4);
    assert_eq!(s.shape(), &[2, 1, 4, 4]);
    assert_eq!(s.sum_all(), 0.0);

    let front = c.slice_channels(0, 3);
    assert_eq!(front.shape(), &[2, 3, 4, 4]);
    assert_abs_diff_eq!(front.sum_all(), 2.0 * 3.0 * 16.0);
}

#[test]
fn test_normal_seeded_is_deterministic() {
    let a = Tensor::new_normal_seeded(0.0, 1.0, &[3, 3], 42);
    let b = Tensor::new_normal_seeded(0.0, 1.0, &[3, 3], 42);
    assert_eq!(a, b);
    assert!(a.is_all_finite());
}

#[test]
fn test_new_normal_statistics() {
    let mut rng = StdRng::seed_from_u64(9);
    let t = Tensor::new_normal(2.0, 0.5, &[64, 64], &mut rng);
    assert_eq!(t.size(), 4096);
    assert!(t.is_all_finite());
    let mean = t.mean_all();
    let var = t.map(|x| (x - mean) * (x - mean)).mean_all();
    assert_abs_diff_eq!(mean, 2.0, epsilon = 0.05);
    assert_abs_diff_eq!(var.sqrt(), 0.5, epsilon = 0.05);
}

#[test]
fn test_is_all_finite() {
    let mut t = Tensor::zeros(&[2, 2]);
    assert!(t.is_all_finite());
    t[[0, 1]] = f32::NAN;
    assert!(!t.is_all_finite());
}

#[test]
fn test_new_random_range() {
    let mut rng = StdRng::seed_from_u64(7);
    let t = Tensor::new_random(-0.5, 0.5, &[4, 4], &mut rng);
    assert!(t.data_as_slice().iter().all(|&x| (-0.5..0.5).contains(&x)));
}
