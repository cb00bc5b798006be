use ndarray::{Array, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::errors::TensorError;

mod ops {
    pub mod add;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod index;
mod property;
mod shape;

#[cfg(test)]
pub mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[1]、[1,1]、[1,1,1]...
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        assert!(
            data.len() == shape.iter().product::<usize>(),
            "{}",
            TensorError::DataShapeMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).unwrap();
        Self { data }
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn filled(value: f32, shape: &[usize]) -> Self {
        Self {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个全0张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(0.0, shape)
    }

    /// 创建一个全1张量
    pub fn ones(shape: &[usize]) -> Self {
        Self::filled(1.0, shape)
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间内均匀分布（使用外部传入的rng，确保可重复性）
    pub fn new_random_with_rng<R: Rng>(min: f32, max: f32, shape: &[usize], rng: &mut R) -> Self {
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(rng))
            .collect::<Vec<_>>();
        Self::new(&data, shape)
    }

    /// 创建一个服从正态分布的随机张量（非确定性，使用thread_rng）
    pub fn new_normal(mean: f32, std_dev: f32, shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        Self::new_normal_with_rng(mean, std_dev, shape, &mut rng)
    }

    /// 创建一个服从正态分布的随机张量（使用外部传入的rng，确保可重复性）。
    /// 采用Box-Muller变换从均匀分布生成正态分布样本。
    pub fn new_normal_with_rng<R: Rng>(
        mean: f32,
        std_dev: f32,
        shape: &[usize],
        rng: &mut R,
    ) -> Self {
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1: f32 = rng.r#gen();
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Self::new(&data, shape)
    }

    /// 以切片形式访问底层数据（行优先存储）
    pub fn data_as_slice(&self) -> &[f32] {
        self.data.as_slice().unwrap()
    }
}

// 内部辅助
impl Tensor {
    pub(crate) fn from_array(data: Array<f32, IxDyn>) -> Self {
        Self { data }
    }

    pub(crate) fn array(&self) -> &Array<f32, IxDyn> {
        &self.data
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.data == other.data
    }
}
