use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Neg, Sub};

impl Sub for &Tensor {
    type Output = Tensor;

    fn sub(self, rhs: &Tensor) -> Tensor {
        assert!(
            self.is_same_shape(rhs),
            "{}",
            TensorError::OperatorError {
                operator: Operator::Sub,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: rhs.shape().to_vec(),
            }
        );
        Tensor::from_array(self.array() - rhs.array())
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(self, rhs: Tensor) -> Tensor {
        &self - &rhs
    }
}

impl Sub<&Tensor> for Tensor {
    type Output = Tensor;

    fn sub(self, rhs: &Tensor) -> Tensor {
        &self - rhs
    }
}

impl Sub<Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, rhs: Tensor) -> Tensor {
        self - &rhs
    }
}

impl Sub<f32> for &Tensor {
    type Output = Tensor;

    fn sub(self, rhs: f32) -> Tensor {
        Tensor::from_array(self.array() - rhs)
    }
}

impl Sub<f32> for Tensor {
    type Output = Tensor;

    fn sub(self, rhs: f32) -> Tensor {
        &self - rhs
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        Tensor::from_array(self.array() * -1.0)
    }
}

impl Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        -&self
    }
}
