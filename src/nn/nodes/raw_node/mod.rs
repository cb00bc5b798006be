/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : 原始节点（raw node）：TraitNode 接口 + NodeType 枚举分发
 *
 * 每种节点实现前向（calc_value_by_parents）与 VJP 反向
 * （calc_grad_to_parent：给定上游梯度，计算传给某个父节点的梯度）。
 */

mod input;
mod loss;
mod ops;
mod parameter;

pub(in crate::nn) use input::{Input, InputKind};
pub(in crate::nn) use loss::MseLoss;
pub use loss::Reduction;
pub(in crate::nn) use ops::{
    Add, BatchNorm, ChannelBiasAdd, Conv2d, Dropout, Flatten, LeakyReLU, MatMul, RunningStats,
    Softmax,
};
pub(in crate::nn) use parameter::Parameter;

use super::{NodeHandle, NodeId};
use crate::nn::GraphError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

#[enum_dispatch]
#[derive(Clone)]
pub(in crate::nn) enum NodeType {
    Input(Input),
    Parameter(Parameter),
    Add(Add),
    MatMul(MatMul),
    Conv2d(Conv2d),
    ChannelBiasAdd(ChannelBiasAdd),
    BatchNorm(BatchNorm),
    Dropout(Dropout),
    LeakyReLU(LeakyReLU),
    Flatten(Flatten),
    Softmax(Softmax),
    MseLoss(MseLoss),
}

#[enum_dispatch(NodeType)]
pub(in crate::nn) trait TraitNode {
    fn id(&self) -> NodeId;

    fn set_id(&mut self, id: NodeId);

    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// 本节点值（张量）的预期形状（在节点创建时即可确定）
    fn value_expected_shape(&self) -> &[usize];

    /// 根据父节点的值计算本节点的值
    /// （注意：该接口只在Graph中使用，调用前所有父节点的值都已被计算）
    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError>;

    fn value(&self) -> Option<&Tensor>;

    fn set_value(&mut self, _value: Option<&Tensor>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}的值只能由前向传播计算，不能手动设置",
            self.display_node()
        )))
    }

    fn clear_value(&mut self) -> Result<(), GraphError>;

    /// VJP：给定上游梯度，计算传给`target_parent`的梯度。
    /// `assistant_parent`是本节点的另一个父节点（若有），
    /// 如MatMul对某个父节点求梯度时需要另一个父节点的值。
    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError>;

    fn grad(&self) -> Option<&Tensor>;

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError>;

    fn clear_grad(&mut self) -> Result<(), GraphError> {
        self.set_grad(None)
    }

    /// 训练/推理模式切换。只有模式相关节点（BatchNorm、Dropout）需要覆写。
    fn set_training(&mut self, _training: bool) {}

    /// 用于错误信息的节点描述
    fn display_node(&self) -> String {
        format!("节点[name={}]", self.name())
    }
}
