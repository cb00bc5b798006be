use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::Ix2;

impl Tensor {
    /// 对每个元素应用函数`f`，返回新张量
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self::from_array(self.array().mapv(|x| f(x)))
    }

    /// 按条件对每个元素二选一：满足`cond`的元素应用`then_fn`，否则应用`else_fn`
    pub fn where_with_f32<C, T, E>(&self, cond: C, then_fn: T, else_fn: E) -> Self
    where
        C: Fn(f32) -> bool,
        T: Fn(f32) -> f32,
        E: Fn(f32) -> f32,
    {
        self.map(|x| if cond(x) { then_fn(x) } else { else_fn(x) })
    }

    /// 逐元素符号函数：正数→1，负数→-1，零→0
    pub fn sign(&self) -> Self {
        self.map(|x| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
    }

    /// 2维矩阵乘法
    pub fn mat_mul(&self, other: &Self) -> Self {
        assert!(
            self.dimension() == 2,
            "{}",
            TensorError::NotMatrix(self.dimension())
        );
        assert!(
            other.dimension() == 2,
            "{}",
            TensorError::NotMatrix(other.dimension())
        );
        assert!(
            self.shape()[1] == other.shape()[0],
            "{}",
            TensorError::IncompatibleShape
        );
        let lhs = self.array().view().into_dimensionality::<Ix2>().unwrap();
        let rhs = other.array().view().into_dimensionality::<Ix2>().unwrap();
        Self::from_array(lhs.dot(&rhs).into_dyn())
    }
}
