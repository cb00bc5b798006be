use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Div, Mul};

impl Mul for &Tensor {
    type Output = Tensor;

    /// 逐元素相乘（Hadamard积），两个张量形状必须严格一致
    fn mul(self, rhs: &Tensor) -> Tensor {
        assert!(
            self.is_same_shape(rhs),
            "{}",
            TensorError::OperatorError {
                operator: Operator::Mul,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: rhs.shape().to_vec(),
            }
        );
        Tensor::from_array(self.array() * rhs.array())
    }
}

impl Mul for Tensor {
    type Output = Tensor;

    fn mul(self, rhs: Tensor) -> Tensor {
        &self * &rhs
    }
}

impl Mul<&Tensor> for Tensor {
    type Output = Tensor;

    fn mul(self, rhs: &Tensor) -> Tensor {
        &self * rhs
    }
}

impl Mul<Tensor> for &Tensor {
    type Output = Tensor;

    fn mul(self, rhs: Tensor) -> Tensor {
        self * &rhs
    }
}

impl Mul<f32> for &Tensor {
    type Output = Tensor;

    fn mul(self, rhs: f32) -> Tensor {
        Tensor::from_array(self.array() * rhs)
    }
}

impl Mul<f32> for Tensor {
    type Output = Tensor;

    fn mul(self, rhs: f32) -> Tensor {
        &self * rhs
    }
}

impl Mul<&Tensor> for f32 {
    type Output = Tensor;

    fn mul(self, rhs: &Tensor) -> Tensor {
        rhs * self
    }
}

impl Div<f32> for &Tensor {
    type Output = Tensor;

    fn div(self, rhs: f32) -> Tensor {
        assert!(rhs != 0.0, "{}", TensorError::DivByZero);
        Tensor::from_array(self.array() / rhs)
    }
}

impl Div<f32> for Tensor {
    type Output = Tensor;

    fn div(self, rhs: f32) -> Tensor {
        &self / rhs
    }
}
