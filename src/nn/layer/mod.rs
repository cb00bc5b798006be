//! 神经网络层：每层在构造时向图注册自己的参数节点，
//! forward 时在图上追加相应的算子节点并返回输出 Var。

mod batch_norm;
mod conv2d;
mod dropout;
mod linear;

pub use batch_norm::BatchNorm;
pub use conv2d::{Conv2d, Padding};
pub use dropout::Dropout;
pub use linear::Linear;
