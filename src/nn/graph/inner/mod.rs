/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : GraphInner 计算图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 基础操作 + forward
 * - backward.rs: VJP 反向传播
 * - mode.rs: train/eval、detach、watch（对输入求梯度）
 * - node_builders.rs: new_*_node
 */

mod backward;
mod core;
mod mode;
mod node_builders;

use crate::nn::NodeId;
use crate::nn::nodes::NodeHandle;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// 图的完整定义（核心实现）
///
/// 这是计算图的核心实现。用户通常通过 `Graph` 句柄使用此结构。
pub struct GraphInner {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle>,
    /// 正向边：parent_id -> child_ids（父节点指向子节点）
    pub(in crate::nn::graph) forward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 反向边：child_id -> parent_ids（子节点指向父节点）
    pub(in crate::nn::graph) backward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 最后一次前向传播的 id
    pub(in crate::nn::graph) last_forward_pass_id: u64,
    /// 最后一次反向传播的 id
    pub(in crate::nn::graph) last_backward_pass_id: u64,
    pub(in crate::nn::graph) next_id: u64,
    pub(in crate::nn::graph) is_eval_mode: bool,
    /// 图级别的随机数生成器（用于参数初始化、派生Dropout种子等）
    /// None 表示使用默认的 thread_rng（非确定性）
    pub(in crate::nn::graph) rng: Option<StdRng>,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
