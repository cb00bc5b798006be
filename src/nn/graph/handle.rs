/*
 * @Author       : 老董
 * @Date         : 2026-08-12
 * @Description  : Graph——计算图的外部句柄。内部是 Rc<RefCell<GraphInner>>，
 *                 允许 Var、层与模型共享同一张图而不与借用检查器搏斗。
 */

use super::error::GraphError;
use super::inner::GraphInner;
use crate::nn::NodeId;
use crate::nn::var::{Init, Var};
use crate::tensor::Tensor;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new())),
        }
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::with_name(name))),
        }
    }

    /// 创建一个带固定种子的计算图：参数初始化与Dropout掩码均可重复
    pub fn new_with_seed(seed: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new_with_seed(seed))),
        }
    }

    // ========== 内部访问 ==========

    pub(in crate::nn) fn inner(&self) -> Ref<'_, GraphInner> {
        self.inner.borrow()
    }

    pub(in crate::nn) fn inner_mut(&self) -> RefMut<'_, GraphInner> {
        self.inner.borrow_mut()
    }

    pub(crate) fn inner_rc(&self) -> Rc<RefCell<GraphInner>> {
        Rc::clone(&self.inner)
    }

    // ========== 节点创建 ==========

    /// 创建一个数据输入变量（值通过 set_value 喂入）
    pub fn input(&self, shape: &[usize]) -> Result<Var, GraphError> {
        let id = self.inner_mut().new_basic_input_node(shape, None)?;
        Ok(Var::new(id, self.inner_rc()))
    }

    pub fn input_named(&self, shape: &[usize], name: &str) -> Result<Var, GraphError> {
        let id = self.inner_mut().new_basic_input_node(shape, Some(name))?;
        Ok(Var::new(id, self.inner_rc()))
    }

    /// 创建一个目标（标签）输入变量。目标输入永远不参与求梯度
    pub fn target(&self, shape: &[usize]) -> Result<Var, GraphError> {
        let id = self.inner_mut().new_target_input_node(shape, None)?;
        Ok(Var::new(id, self.inner_rc()))
    }

    /// 创建一个参数变量并按 init 策略初始化其值
    pub fn parameter(
        &self,
        shape: &[usize],
        init: Init,
        name: Option<&str>,
    ) -> Result<Var, GraphError> {
        let mut inner = self.inner_mut();
        let id = inner.new_parameter_node(shape, name)?;
        let seed = inner.draw_seed();
        let value = init.generate(shape, seed);
        inner.set_node_value(id, Some(&value))?;
        drop(inner);
        Ok(Var::new(id, self.inner_rc()))
    }

    /// 创建一个值恒为1的输入变量（常用于bias的广播）
    pub fn ones(&self, shape: &[usize]) -> Result<Var, GraphError> {
        let mut inner = self.inner_mut();
        let id = inner.new_basic_input_node(shape, None)?;
        inner.set_node_value(id, Some(&Tensor::ones(shape)))?;
        drop(inner);
        Ok(Var::new(id, self.inner_rc()))
    }

    // ========== 前向/反向 ==========

    pub fn forward(&self, var: &Var) -> Result<(), GraphError> {
        self.inner_mut().forward(var.node_id())
    }

    /// 对标量损失节点做反向传播，返回损失值
    pub fn backward(&self, loss: &Var) -> Result<f32, GraphError> {
        self.inner_mut().backward(loss.node_id())
    }

    /// 清空所有参数节点的梯度
    pub fn zero_grad(&self) -> Result<(), GraphError> {
        self.inner_mut().zero_grad()
    }

    // ========== 模式与种子 ==========

    pub fn train(&self) {
        self.inner_mut().set_train_mode();
    }

    pub fn eval(&self) {
        self.inner_mut().set_eval_mode();
    }

    pub fn is_eval(&self) -> bool {
        self.inner().is_eval_mode()
    }

    pub fn set_seed(&self, seed: u64) {
        self.inner_mut().set_seed(seed);
    }

    pub fn has_seed(&self) -> bool {
        self.inner().has_seed()
    }

    pub fn nodes_count(&self) -> usize {
        self.inner().nodes_count()
    }

    // ========== 临时子图 ==========

    /// 当前的节点ID水位，配合`remove_nodes_since`丢弃之后追加的临时子图
    pub fn node_id_watermark(&self) -> NodeId {
        self.inner().node_id_watermark()
    }

    /// 移除水位之后创建的所有节点。典型用法：搭一条一次性的前向链
    /// 取完梯度后整体丢弃，避免图随调用次数无限增长
    pub fn remove_nodes_since(&self, watermark: NodeId) {
        self.inner_mut().remove_nodes_since(watermark);
    }

    pub fn name(&self) -> String {
        self.inner().name().to_string()
    }
}
