use super::Tensor;
use ndarray::IxDyn;
use std::ops::{Index, IndexMut};

/// 多维下标访问，如`t[[b, c, i, j]]`。下标长度必须与张量维数一致。
impl<const N: usize> Index<[usize; N]> for Tensor {
    type Output = f32;

    fn index(&self, index: [usize; N]) -> &Self::Output {
        &self.data[IxDyn(&index)]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for Tensor {
    fn index_mut(&mut self, index: [usize; N]) -> &mut Self::Output {
        &mut self.data[IxDyn(&index)]
    }
}
