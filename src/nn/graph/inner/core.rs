/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : GraphInner 核心操作 + 前向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::{NodeHandle, NodeType};
use crate::tensor::Tensor;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

impl GraphInner {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            last_forward_pass_id: 0,
            last_backward_pass_id: 0,
            next_id: 0,
            is_eval_mode: false,
            rng: None,
        }
    }

    /// 创建一个带固定种子的计算图（确保可重复性）
    pub fn new_with_seed(seed: u64) -> Self {
        let mut graph = Self::new();
        graph.rng = Some(StdRng::seed_from_u64(seed));
        graph
    }

    // ========== 基础访问器 ==========

    #[cfg(test)]
    pub(in crate::nn) fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    /// 设置/重置图的随机种子
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Some(StdRng::seed_from_u64(seed));
    }

    /// 检查图是否有固定种子
    pub const fn has_seed(&self) -> bool {
        self.rng.is_some()
    }

    /// 从图的rng派生一个种子（图没有种子时返回None，表示走系统熵）
    pub(in crate::nn::graph) fn draw_seed(&mut self) -> Option<u64> {
        self.rng.as_mut().map(|rng| rng.r#gen())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<&NodeHandle>, GraphError> {
        ids.iter().map(|&id| self.get_node(id)).collect()
    }

    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.backward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let _ = self.get_node(id)?;
        Ok(self.forward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    pub fn get_node_value_expected_shape(&self, id: NodeId) -> Result<Vec<usize>, GraphError> {
        Ok(self.get_node(id)?.value_expected_shape().to_vec())
    }

    pub fn has_node_value(&self, node_id: NodeId) -> Result<bool, GraphError> {
        self.nodes
            .get(&node_id)
            .map(NodeHandle::has_value)
            .ok_or(GraphError::NodeNotFound(node_id))
    }

    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.value())
    }

    pub fn set_node_value(&mut self, id: NodeId, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_value(value)
    }

    pub fn get_node_grad(&self, id: NodeId) -> Result<Option<Tensor>, GraphError> {
        let node = self.get_node(id)?;
        // 未被watch的输入节点不应该有梯度
        if let NodeType::Input(input) = node.node_type() {
            if !input.requires_grad() {
                return Err(GraphError::InvalidOperation(format!(
                    "输入{node}未被watch（requires_grad=false），没有梯度"
                )));
            }
        }
        Ok(node.grad().cloned())
    }

    /// 获取所有可训练的参数节点
    pub fn get_trainable_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter_map(|(&id, node)| {
                if let NodeType::Parameter(_) = node.node_type() {
                    Some(id)
                } else {
                    None
                }
            })
            .collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    // ========== ID/名称生成 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 生成唯一的节点ID（先递增再返回，所以第一个节点 ID 是 1）
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(&self, name: &str) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 前向传播 ==========

    pub fn forward(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.get_node(node_id)?;
        match node.node_type() {
            NodeType::Input(_) | NodeType::Parameter(_) => {
                if node.has_value() {
                    return Ok(());
                }
                return Err(GraphError::InvalidOperation(format!(
                    "{node}是输入/参数类型，其值应通过 set_value 设置，而非通过父节点前向传播计算"
                )));
            }
            _ => {}
        }

        let new_graph_forward_pass_id = self.last_forward_pass_id + 1;
        self.forward_node_internal(node_id, new_graph_forward_pass_id)?;
        self.last_forward_pass_id = new_graph_forward_pass_id;
        Ok(())
    }

    fn forward_node_internal(
        &mut self,
        node_id: NodeId,
        new_graph_forward_pass_id: u64,
    ) -> Result<(), GraphError> {
        let node = self.get_node_mut(node_id)?;

        match node.node_type() {
            NodeType::Input(_) | NodeType::Parameter(_) => {
                if node.has_value() {
                    node.set_last_forward_pass_id(new_graph_forward_pass_id);
                    return Ok(());
                }
                return Err(GraphError::InvalidOperation(format!(
                    "{node}不能直接前向传播"
                )));
            }
            _ => {
                // 本轮已计算过则直接复用（memoization）
                if node.last_forward_pass_id() == new_graph_forward_pass_id {
                    return Ok(());
                }
            }
        }

        let parents_ids = self.get_node_parents(node_id)?;
        for parent_id in &parents_ids {
            self.forward_node_internal(*parent_id, new_graph_forward_pass_id)?;
        }

        let parent_nodes = parents_ids
            .iter()
            .map(|id| self.get_node(*id).cloned())
            .collect::<Result<Vec<NodeHandle>, GraphError>>()?;

        let training = !self.is_eval_mode;
        let node = self.get_node_mut(node_id)?;
        // 模式相关节点（BatchNorm、Dropout）在计算前同步当前模式
        node.set_training(training);
        node.calc_value_by_parents(&parent_nodes)?;
        node.set_last_forward_pass_id(new_graph_forward_pass_id);

        Ok(())
    }

    /// 释放中间节点的值和梯度（输入/参数节点保留）
    pub(in crate::nn::graph) fn release_intermediate_results(&mut self) -> Result<(), GraphError> {
        for node in self.nodes.values_mut() {
            match node.node_type() {
                NodeType::Input(_) | NodeType::Parameter(_) => {}
                _ => {
                    node.clear_value()?;
                    let _ = node.clear_grad();
                }
            }
        }
        Ok(())
    }

    // ========== 临时子图的移除 ==========

    /// 当前的节点ID水位。此后新建的节点ID都大于该值，
    /// 配合`remove_nodes_since`可以把一段临时前向链整体移除
    pub const fn node_id_watermark(&self) -> NodeId {
        NodeId(self.next_id)
    }

    /// 移除水位之后创建的所有节点（含其值、梯度与边）。
    /// 水位之前的节点不可能以新节点为父节点，故只需清理幸存节点的子节点表。
    /// 节点ID不回退，不会复用
    pub fn remove_nodes_since(&mut self, watermark: NodeId) {
        self.nodes.retain(|id, _| id.0 <= watermark.0);
        self.backward_edges.retain(|id, _| id.0 <= watermark.0);
        self.forward_edges.retain(|id, _| id.0 <= watermark.0);
        for children in self.forward_edges.values_mut() {
            children.retain(|child| child.0 <= watermark.0);
        }
    }

    /// 重置中间节点（含被watch的输入）的 grad，参数节点的grad保留以便累积
    pub(in crate::nn::graph) fn reset_intermediate_grad(&mut self) {
        for node in self.nodes.values_mut() {
            match node.node_type() {
                NodeType::Parameter(_) => {}
                _ => {
                    let _ = node.clear_grad();
                    node.set_last_backward_pass_id(0);
                }
            }
        }
    }
}
