/*
 * @Author       : 老董
 * @Date         : 2026-08-10
 * @Description  : 神经网络模块：计算图、节点、Var 句柄、层
 */

mod graph;
mod layer;
mod module;
mod nodes;
mod var;
mod var_ops;

#[cfg(test)]
mod tests;

pub use graph::{Graph, GraphError, GraphInner};
pub use layer::{BatchNorm, Conv2d, Dropout, Linear, Padding};
pub use module::Module;
pub use nodes::{NodeId, Reduction};
pub use var::{Init, Var};
pub use var_ops::{VarActivationOps, VarLossOps, VarMatrixOps, VarShapeOps};
