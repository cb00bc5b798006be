use super::Tensor;

impl Tensor {
    /// 张量的维（dim）数、阶（rank）数
    /// 即`shape()`的元素个数--如：形状为`[1,1]`的标量阶数为2，向量阶数为1，矩阵阶数为2，以此类推
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 张量中元素的总数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断张量是否为标量（所有维度均为1）
    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty() || self.shape().iter().all(|x| *x == 1)
    }

    /// 转化为纯数（number）。若为标量，则返回Some(number)，否则返回None
    pub fn get_data_number(&self) -> Option<f32> {
        if self.is_scalar() {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    /// 所有元素之和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的均值
    pub fn mean(&self) -> f32 {
        self.sum() / self.size() as f32
    }

    /// 与另一个张量逐元素差的最大绝对值（形状必须一致）
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        assert!(
            self.is_same_shape(other),
            "{}",
            crate::errors::TensorError::IncompatibleShape
        );
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }
}
