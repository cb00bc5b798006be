use crate::assert_panic;
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_new_and_shape() {
    let t = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.size(), 6);
    assert_eq!(t.dimension(), 2);
    assert_eq!(t[[1, 2]], 6.0);
}

#[test]
fn test_new_with_mismatched_data_panics() {
    assert_panic!(Tensor::new(&[1.0, 2.0, 3.0], &[2, 2]));
}

#[test]
fn test_filled_zeros_ones() {
    assert_eq!(Tensor::filled(2.5, &[2, 2]).data_as_slice(), &[2.5; 4]);
    assert_eq!(Tensor::zeros(&[3]).data_as_slice(), &[0.0; 3]);
    assert_eq!(Tensor::ones(&[1, 2, 2]).data_as_slice(), &[1.0; 4]);
}

#[test]
fn test_is_scalar_and_get_data_number() {
    assert!(Tensor::new(&[5.0], &[1, 1]).is_scalar());
    assert_eq!(Tensor::new(&[5.0], &[1, 1]).get_data_number(), Some(5.0));

    let vector = Tensor::new(&[1.0, 2.0], &[1, 2]);
    assert!(!vector.is_scalar());
    assert_eq!(vector.get_data_number(), None);
}

#[test]
fn test_new_random_with_rng_bounds_and_determinism() {
    let mut rng = StdRng::seed_from_u64(42);
    let a = Tensor::new_random_with_rng(-1.0, 1.0, &[10, 10], &mut rng);
    assert!(a.data_as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));

    let mut rng2 = StdRng::seed_from_u64(42);
    let b = Tensor::new_random_with_rng(-1.0, 1.0, &[10, 10], &mut rng2);
    assert_eq!(a, b);
}

#[test]
fn test_new_normal_with_rng_statistics() {
    let mut rng = StdRng::seed_from_u64(42);
    let t = Tensor::new_normal_with_rng(3.0, 0.5, &[100, 100], &mut rng);
    assert_abs_diff_eq!(t.mean(), 3.0, epsilon = 0.02);

    let mean = t.mean();
    let var = t
        .data_as_slice()
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f32>()
        / t.size() as f32;
    assert_abs_diff_eq!(var.sqrt(), 0.5, epsilon = 0.02);
}
