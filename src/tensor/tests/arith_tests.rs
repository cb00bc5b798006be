use crate::assert_panic;
use crate::tensor::Tensor;

#[test]
fn test_add_tensors() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let b = Tensor::new(&[10.0, 20.0, 30.0, 40.0], &[2, 2]);
    let expected = Tensor::new(&[11.0, 22.0, 33.0, 44.0], &[2, 2]);

    assert_eq!(&a + &b, expected);
    assert_eq!(a.clone() + &b, expected);
    assert_eq!(&a + b.clone(), expected);
    assert_eq!(a.clone() + b.clone(), expected);
}

#[test]
fn test_add_shape_mismatch_panics() {
    let a = Tensor::ones(&[2, 2]);
    let b = Tensor::ones(&[2, 3]);
    assert_panic!(&a + &b);
}

#[test]
fn test_add_assign() {
    let mut a = Tensor::new(&[1.0, 2.0], &[1, 2]);
    a += &Tensor::new(&[3.0, 4.0], &[1, 2]);
    assert_eq!(a, Tensor::new(&[4.0, 6.0], &[1, 2]));
}

#[test]
fn test_add_scalar() {
    let a = Tensor::new(&[1.0, -2.0], &[1, 2]);
    assert_eq!(&a + 1.5, Tensor::new(&[2.5, -0.5], &[1, 2]));
}

#[test]
fn test_sub_and_neg() {
    let a = Tensor::new(&[5.0, 3.0], &[1, 2]);
    let b = Tensor::new(&[1.0, 4.0], &[1, 2]);
    assert_eq!(&a - &b, Tensor::new(&[4.0, -1.0], &[1, 2]));
    assert_eq!(-&a, Tensor::new(&[-5.0, -3.0], &[1, 2]));
    assert_eq!(&a - 1.0, Tensor::new(&[4.0, 2.0], &[1, 2]));
}

#[test]
fn test_mul_elementwise_and_scalar() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let b = Tensor::new(&[2.0, 0.5, -1.0, 0.0], &[2, 2]);
    assert_eq!(&a * &b, Tensor::new(&[2.0, 1.0, -3.0, 0.0], &[2, 2]));
    assert_eq!(&a * 2.0, Tensor::new(&[2.0, 4.0, 6.0, 8.0], &[2, 2]));
    assert_eq!(2.0 * &a, Tensor::new(&[2.0, 4.0, 6.0, 8.0], &[2, 2]));
}

#[test]
fn test_div_scalar() {
    let a = Tensor::new(&[2.0, 4.0], &[1, 2]);
    assert_eq!(&a / 2.0, Tensor::new(&[1.0, 2.0], &[1, 2]));
    assert_panic!(&a / 0.0);
}
