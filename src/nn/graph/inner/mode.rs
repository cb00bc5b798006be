/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : GraphInner train/eval 模式、detach、watch（对输入求梯度）
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::NodeType;

impl GraphInner {
    pub const fn set_train_mode(&mut self) {
        self.is_eval_mode = false;
    }

    pub const fn set_eval_mode(&mut self) {
        self.is_eval_mode = true;
    }

    pub const fn is_train_mode(&self) -> bool {
        !self.is_eval_mode
    }

    pub const fn is_eval_mode(&self) -> bool {
        self.is_eval_mode
    }

    // ========== watch 机制（对输入求梯度） ==========

    /// 将某个输入节点标记为"被观察"：反向传播会把损失对它的梯度存在该节点上。
    /// 只有数据输入可以被watch（目标输入、参数、中间节点都不行）。
    pub fn watch_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.set_node_requires_grad(node_id, true)
    }

    pub fn set_node_requires_grad(
        &mut self,
        node_id: NodeId,
        requires_grad: bool,
    ) -> Result<(), GraphError> {
        let node = self.get_node_mut(node_id)?;
        match node.node_type_mut() {
            NodeType::Input(input) => input.set_requires_grad(requires_grad),
            _ => Err(GraphError::InvalidOperation(format!(
                "节点{node_id:?}不是输入节点，不支持watch/requires_grad"
            ))),
        }
    }

    // ========== detach 机制 ==========

    /// 将节点标记为 detached：反向传播到此为止，不再向其父节点传播
    pub fn detach_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.get_node_mut(node_id)?.set_detached(true);
        Ok(())
    }

    /// 取消节点的 detach 状态
    pub fn attach_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.get_node_mut(node_id)?.set_detached(false);
        Ok(())
    }

    /// 检查节点是否被 detach
    pub fn is_node_detached(&self, node_id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(node_id)?.is_detached())
    }

    /// 临时切换到eval模式执行闭包，结束后恢复原模式
    pub fn no_grad_scope<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let was_train = self.is_train_mode();
        self.set_eval_mode();
        let result = f(self);
        if was_train {
            self.set_train_mode();
        }
        result
    }
}
