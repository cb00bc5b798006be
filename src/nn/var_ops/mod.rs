//! Var 上的链式运算——每个方法都在图上追加一个相应的算子节点

mod activation;
mod loss;
mod matrix;
mod shape;

pub use activation::VarActivationOps;
pub use loss::VarLossOps;
pub use matrix::VarMatrixOps;
pub use shape::VarShapeOps;
