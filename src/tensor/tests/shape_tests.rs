use crate::assert_panic;
use crate::tensor::Tensor;

#[test]
fn test_reshape_keeps_row_major_order() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let b = a.reshape(&[3, 2]);
    assert_eq!(b.shape(), &[3, 2]);
    assert_eq!(b.data_as_slice(), a.data_as_slice());

    // 4维 → 2维（Flatten的底层操作）
    let c = a.reshape(&[1, 6]);
    assert_eq!(c[[0, 5]], 6.0);
}

#[test]
fn test_reshape_wrong_size_panics() {
    let a = Tensor::ones(&[2, 3]);
    assert_panic!(a.reshape(&[2, 2]));
}

#[test]
fn test_is_same_shape_is_strict() {
    let a = Tensor::ones(&[1, 4]);
    let b = Tensor::ones(&[4]);
    assert!(!a.is_same_shape(&b));
    assert!(a.is_same_shape(&Tensor::zeros(&[1, 4])));
}

#[test]
fn test_transpose() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let t = a.transpose();
    assert_eq!(t, Tensor::new(&[1.0, 4.0, 2.0, 5.0, 3.0, 6.0], &[3, 2]));
}

#[test]
fn test_index_and_index_mut() {
    let mut a = Tensor::zeros(&[1, 2, 2, 2]);
    a[[0, 1, 1, 0]] = 7.0;
    assert_eq!(a[[0, 1, 1, 0]], 7.0);
    assert_eq!(a.sum(), 7.0);
}
