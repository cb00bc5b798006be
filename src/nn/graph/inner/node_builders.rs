/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : GraphInner 节点构造器（new_*_node）
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::raw_node::InputKind;
use crate::nn::nodes::{NodeHandle, Reduction, RunningStats};
use std::cell::RefCell;
use std::rc::Rc;

impl GraphInner {
    // ========== 叶子节点 ==========

    pub fn new_basic_input_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeHandle::new_input(shape, InputKind::Data)?;
        self.add_node_to_list(node, name, "input", &[])
    }

    pub fn new_target_input_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeHandle::new_input(shape, InputKind::Target)?;
        self.add_node_to_list(node, name, "target", &[])
    }

    pub fn new_parameter_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeHandle::new_parameter(shape)?;
        self.add_node_to_list(node, name, "parameter", &[])
    }

    // ========== 算子节点 ==========

    pub fn new_add_node(
        &mut self,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_add(&self.get_nodes(parents)?)?;
        self.add_node_to_list(handle, name, "add", parents)
    }

    pub fn new_mat_mul_node(
        &mut self,
        left_node_id: NodeId,
        right_node_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_mat_mul(&self.get_nodes(&[left_node_id, right_node_id])?)?;
        self.add_node_to_list(handle, name, "mat_mul", &[left_node_id, right_node_id])
    }

    pub fn new_conv2d_node(
        &mut self,
        input_id: NodeId,
        kernel_id: NodeId,
        stride: (usize, usize),
        padding: (usize, usize, usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle =
            NodeHandle::new_conv2d(&self.get_nodes(&[input_id, kernel_id])?, stride, padding)?;
        self.add_node_to_list(handle, name, "conv2d", &[input_id, kernel_id])
    }

    pub fn new_channel_bias_add_node(
        &mut self,
        input_id: NodeId,
        bias_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_channel_bias_add(&self.get_nodes(&[input_id, bias_id])?)?;
        self.add_node_to_list(handle, name, "channel_bias_add", &[input_id, bias_id])
    }

    pub fn new_batch_norm_node(
        &mut self,
        input_id: NodeId,
        gamma_id: NodeId,
        beta_id: NodeId,
        momentum: f32,
        eps: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_batch_norm(
            &self.get_nodes(&[input_id, gamma_id, beta_id])?,
            momentum,
            eps,
            None,
        )?;
        self.add_node_to_list(handle, name, "batch_norm", &[input_id, gamma_id, beta_id])
    }

    /// 与`new_batch_norm_node`相同，但使用外部持有的running统计量。
    /// 层每次forward新建的节点借此共享同一份统计量
    pub fn new_batch_norm_node_with_stats(
        &mut self,
        input_id: NodeId,
        gamma_id: NodeId,
        beta_id: NodeId,
        momentum: f32,
        eps: f32,
        stats: Rc<RefCell<RunningStats>>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_batch_norm(
            &self.get_nodes(&[input_id, gamma_id, beta_id])?,
            momentum,
            eps,
            Some(stats),
        )?;
        self.add_node_to_list(handle, name, "batch_norm", &[input_id, gamma_id, beta_id])
    }

    pub fn new_dropout_node(
        &mut self,
        parent_id: NodeId,
        rate: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        // Dropout节点的掩码rng种子从图rng派生，保证整图种子固定时可重复
        let seed = self.draw_seed();
        let handle = NodeHandle::new_dropout(&self.get_nodes(&[parent_id])?, rate, seed)?;
        self.add_node_to_list(handle, name, "dropout", &[parent_id])
    }

    pub fn new_leaky_relu_node(
        &mut self,
        parent_id: NodeId,
        negative_slope: f64,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_leaky_relu(&self.get_nodes(&[parent_id])?, negative_slope)?;
        self.add_node_to_list(handle, name, "leaky_relu", &[parent_id])
    }

    /// ReLU = negative_slope为0的LeakyReLU
    pub fn new_relu_node(
        &mut self,
        parent_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_leaky_relu(&self.get_nodes(&[parent_id])?, 0.0)?;
        self.add_node_to_list(handle, name, "relu", &[parent_id])
    }

    pub fn new_flatten_node(
        &mut self,
        parent_id: NodeId,
        keep_first_dim: bool,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_flatten(&self.get_nodes(&[parent_id])?, keep_first_dim)?;
        self.add_node_to_list(handle, name, "flatten", &[parent_id])
    }

    pub fn new_softmax_node(
        &mut self,
        parent_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_softmax(&self.get_nodes(&[parent_id])?)?;
        self.add_node_to_list(handle, name, "softmax", &[parent_id])
    }

    // ========== 损失节点 ==========

    pub fn new_mse_loss_node(
        &mut self,
        pred_id: NodeId,
        target_id: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.new_mse_loss_node_with_reduction(pred_id, target_id, Reduction::Mean, name)
    }

    pub fn new_mse_loss_node_with_reduction(
        &mut self,
        pred_id: NodeId,
        target_id: NodeId,
        reduction: Reduction,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let handle = NodeHandle::new_mse_loss(&self.get_nodes(&[pred_id, target_id])?, reduction)?;
        self.add_node_to_list(handle, name, "mse_loss", &[pred_id, target_id])
    }

    // ========== 注册 ==========

    pub(in crate::nn::graph) fn add_node_to_list(
        &mut self,
        mut handle: NodeHandle,
        name: Option<&str>,
        node_type: &str,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), node_type)?;
        let id = self.generate_valid_node_id();
        handle.set_id(id);
        handle.set_name(&node_name);

        for parent_id in parents {
            self.forward_edges.entry(*parent_id).or_default().push(id);
        }
        self.backward_edges.insert(id, parents.to_vec());
        self.nodes.insert(id, handle);

        Ok(id)
    }
}
