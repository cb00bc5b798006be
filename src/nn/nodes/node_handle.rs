use super::raw_node::{
    Add, BatchNorm, ChannelBiasAdd, Conv2d, Dropout, Flatten, Input, InputKind, LeakyReLU, MatMul,
    MseLoss, NodeType, Parameter, Reduction, RunningStats, Softmax, TraitNode,
};
use super::NodeId;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// 节点句柄：包装具体节点（NodeType），并持有图层面的簿记信息
/// （前/反向传播的pass id、detach标记）。
#[derive(Clone)]
pub(in crate::nn) struct NodeHandle {
    raw_node: NodeType,
    last_forward_pass_id: u64,
    last_backward_pass_id: u64,
    detached: bool,
}

impl NodeHandle {
    fn new<T: Into<NodeType>>(raw_node: T) -> Self {
        Self {
            raw_node: raw_node.into(),
            last_forward_pass_id: 0,
            last_backward_pass_id: 0,
            detached: false,
        }
    }

    // ========== 各类节点的构造 ==========

    pub(in crate::nn) fn new_input(shape: &[usize], kind: InputKind) -> Result<Self, GraphError> {
        Ok(Self::new(Input::new(shape, kind)?))
    }

    pub(in crate::nn) fn new_parameter(shape: &[usize]) -> Result<Self, GraphError> {
        Ok(Self::new(Parameter::new(shape)?))
    }

    pub(in crate::nn) fn new_add(parents: &[&Self]) -> Result<Self, GraphError> {
        Ok(Self::new(Add::new(parents)?))
    }

    pub(in crate::nn) fn new_mat_mul(parents: &[&Self]) -> Result<Self, GraphError> {
        Ok(Self::new(MatMul::new(parents)?))
    }

    pub(in crate::nn) fn new_conv2d(
        parents: &[&Self],
        stride: (usize, usize),
        padding: (usize, usize, usize, usize),
    ) -> Result<Self, GraphError> {
        Ok(Self::new(Conv2d::new(parents, stride, padding)?))
    }

    pub(in crate::nn) fn new_channel_bias_add(parents: &[&Self]) -> Result<Self, GraphError> {
        Ok(Self::new(ChannelBiasAdd::new(parents)?))
    }

    pub(in crate::nn) fn new_batch_norm(
        parents: &[&Self],
        momentum: f32,
        eps: f32,
        shared_stats: Option<Rc<RefCell<RunningStats>>>,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(BatchNorm::new(parents, momentum, eps, shared_stats)?))
    }

    pub(in crate::nn) fn new_dropout(
        parents: &[&Self],
        rate: f32,
        seed: Option<u64>,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(Dropout::new(parents, rate, seed)?))
    }

    pub(in crate::nn) fn new_leaky_relu(
        parents: &[&Self],
        negative_slope: f64,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(LeakyReLU::new(parents, negative_slope)?))
    }

    pub(in crate::nn) fn new_flatten(
        parents: &[&Self],
        keep_first_dim: bool,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(Flatten::new(parents, keep_first_dim)?))
    }

    pub(in crate::nn) fn new_softmax(parents: &[&Self]) -> Result<Self, GraphError> {
        Ok(Self::new(Softmax::new(parents)?))
    }

    pub(in crate::nn) fn new_mse_loss(
        parents: &[&Self],
        reduction: Reduction,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(MseLoss::new(parents, reduction)?))
    }

    // ========== 对raw_node的转发 ==========

    pub(in crate::nn) fn id(&self) -> NodeId {
        self.raw_node.id()
    }

    pub(in crate::nn) fn set_id(&mut self, id: NodeId) {
        self.raw_node.set_id(id);
    }

    pub(in crate::nn) fn name(&self) -> &str {
        self.raw_node.name()
    }

    pub(in crate::nn) fn set_name(&mut self, name: &str) {
        self.raw_node.set_name(name);
    }

    pub(in crate::nn) fn value_expected_shape(&self) -> &[usize] {
        self.raw_node.value_expected_shape()
    }

    pub(in crate::nn) fn value(&self) -> Option<&Tensor> {
        self.raw_node.value()
    }

    pub(in crate::nn) fn has_value(&self) -> bool {
        self.raw_node.value().is_some()
    }

    pub(in crate::nn) fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node.set_value(value)
    }

    pub(in crate::nn) fn clear_value(&mut self) -> Result<(), GraphError> {
        self.raw_node.clear_value()
    }

    pub(in crate::nn) fn calc_value_by_parents(
        &mut self,
        parents: &[Self],
    ) -> Result<(), GraphError> {
        self.raw_node.calc_value_by_parents(parents)
    }

    pub(in crate::nn) fn calc_grad_to_parent(
        &self,
        target_parent: &Self,
        upstream_grad: &Tensor,
        assistant_parent: Option<&Self>,
    ) -> Result<Tensor, GraphError> {
        self.raw_node
            .calc_grad_to_parent(target_parent, upstream_grad, assistant_parent)
    }

    pub(in crate::nn) fn grad(&self) -> Option<&Tensor> {
        self.raw_node.grad()
    }

    pub(in crate::nn) fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node.set_grad(grad)
    }

    pub(in crate::nn) fn clear_grad(&mut self) -> Result<(), GraphError> {
        self.raw_node.clear_grad()
    }

    pub(in crate::nn) fn set_training(&mut self, training: bool) {
        self.raw_node.set_training(training);
    }

    pub(in crate::nn) const fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub(in crate::nn) fn node_type_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    // ========== 图层面的簿记 ==========

    pub(in crate::nn) const fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub(in crate::nn) fn set_last_forward_pass_id(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
    }

    pub(in crate::nn) fn set_last_backward_pass_id(&mut self, pass_id: u64) {
        self.last_backward_pass_id = pass_id;
    }

    #[allow(dead_code)]
    pub(in crate::nn) const fn last_backward_pass_id(&self) -> u64 {
        self.last_backward_pass_id
    }

    pub(in crate::nn) const fn is_detached(&self) -> bool {
        self.detached
    }

    pub(in crate::nn) fn set_detached(&mut self, detached: bool) {
        self.detached = detached;
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "节点[id={:?}, name={}]", self.id(), self.name())
    }
}
