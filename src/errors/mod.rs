use thiserror::Error;

/// 张量层错误。
/// 注：张量的算术运算在形状不符时直接panic（携带本错误的文本），
/// 可失败的图操作则统一走`nn::GraphError`。
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("数据长度({data_len})与形状{shape:?}的元素总数不匹配")]
    DataShapeMismatch { data_len: usize, shape: Vec<usize> },

    #[error("形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}")]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },

    #[error("张量形状不兼容")]
    IncompatibleShape,
    #[error("矩阵乘法要求2维张量，但得到维度{0}")]
    NotMatrix(usize),
    #[error("除数为零")]
    DivByZero,
}

use std::fmt::{self, Display};

/// 张量的二元运算符
#[derive(Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    AddAssign,
    Sub,
    Mul,
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation_name = match self {
            Operator::Add => "相加",
            Operator::AddAssign => "自相加",
            Operator::Sub => "相减",
            Operator::Mul => "相乘",
        };
        write!(f, "{operation_name}")
    }
}
