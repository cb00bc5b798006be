use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 变形为新形状（元素总数必须一致），返回新张量
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let total_elements: usize = self.data.len();
        let new_total_elements: usize = shape.iter().product();
        assert!(
            total_elements == new_total_elements,
            "{}",
            TensorError::IncompatibleShape
        );
        Self {
            data: self.data.clone().into_shape(shape).unwrap(),
        }
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 2维矩阵转置
    pub fn transpose(&self) -> Self {
        assert!(
            self.dimension() == 2,
            "{}",
            TensorError::NotMatrix(self.dimension())
        );
        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let mut result = Self::zeros(&[cols, rows]);
        for i in 0..rows {
            for j in 0..cols {
                result[[j, i]] = self[[i, j]];
            }
        }
        result
    }
}
