use crate::nn::NodeId;
use std::fmt;

/// 计算图层面的错误
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    NodeNotFound(NodeId),
    InvalidOperation(String),
    ComputationError(String),
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    DuplicateNodeName(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "图中找不到节点{id:?}"),
            Self::InvalidOperation(msg) => write!(f, "非法操作：{msg}"),
            Self::ComputationError(msg) => write!(f, "计算错误：{msg}"),
            Self::ShapeMismatch {
                expected,
                got,
                message,
            } => write!(f, "形状不匹配：预期{expected:?}，实际{got:?}。{message}"),
            Self::DimensionMismatch {
                expected,
                got,
                message,
            } => write!(f, "维度不匹配：预期{expected}维，实际{got}维。{message}"),
            Self::DuplicateNodeName(msg) => write!(f, "节点名称重复：{msg}"),
        }
    }
}

impl std::error::Error for GraphError {}
