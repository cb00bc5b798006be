/*
 * @Author       : 老董
 * @Date         : 2026-08-12
 * @Description  : Var——图中节点的轻量句柄，以及参数初始化策略 Init。
 *                 Var 内部持有图的 Rc<RefCell<GraphInner>>，因此可以自由克隆、
 *                 在层与模型之间传递，所有运算都会落回同一张图。
 */

use super::graph::{GraphError, GraphInner};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;

use crate::nn::NodeId;

/// 参数初始化策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    Zeros,
    Ones,
    Constant(f32),
    /// 正态分布 N(mean, std²)
    Normal {
        mean: f32,
        std: f32,
    },
    /// He初始化：N(0, 2/fan_in)，适合ReLU族激活
    Kaiming,
    /// Glorot初始化：N(0, 2/(fan_in+fan_out))
    Xavier,
}

impl Init {
    /// 按策略生成初始值。seed为Some时用固定种子的rng（可重复），
    /// None时走系统熵。
    pub fn generate(&self, shape: &[usize], seed: Option<u64>) -> Tensor {
        match *self {
            Self::Zeros => Tensor::zeros(shape),
            Self::Ones => Tensor::ones(shape),
            Self::Constant(v) => Tensor::filled(v, shape),
            Self::Normal { mean, std } => Self::normal(mean, std, shape, seed),
            Self::Kaiming => {
                let std = (2.0 / Self::fan_in(shape) as f32).sqrt();
                Self::normal(0.0, std, shape, seed)
            }
            Self::Xavier => {
                let std = (2.0 / (Self::fan_in(shape) + Self::fan_out(shape)) as f32).sqrt();
                Self::normal(0.0, std, shape, seed)
            }
        }
    }

    fn normal(mean: f32, std: f32, shape: &[usize], seed: Option<u64>) -> Tensor {
        match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                Tensor::new_normal_with_rng(mean, std, shape, &mut rng)
            }
            None => Tensor::new_normal(mean, std, shape),
        }
    }

    // 2维视为矩阵[in, out]；4维视为卷积核[out_c, in_c, kh, kw]
    fn fan_in(shape: &[usize]) -> usize {
        if shape.len() == 2 {
            shape[0]
        } else {
            shape[1..].iter().product::<usize>().max(1)
        }
    }

    fn fan_out(shape: &[usize]) -> usize {
        if shape.len() == 2 {
            shape[1]
        } else {
            (shape[0] * shape[2..].iter().product::<usize>().max(1)).max(1)
        }
    }
}

#[derive(Clone)]
pub struct Var {
    node_id: NodeId,
    graph: Rc<RefCell<GraphInner>>,
}

impl Var {
    pub(in crate::nn) fn new(node_id: NodeId, graph: Rc<RefCell<GraphInner>>) -> Self {
        Self { node_id, graph }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub(in crate::nn) fn graph(&self) -> &Rc<RefCell<GraphInner>> {
        &self.graph
    }

    pub fn name(&self) -> String {
        self.graph
            .borrow()
            .get_node_name(self.node_id)
            .map(str::to_string)
            .unwrap_or_default()
    }

    // ========== 值与梯度 ==========

    pub fn value(&self) -> Option<Tensor> {
        let inner = self.graph.borrow();
        inner
            .get_node_value(self.node_id)
            .ok()
            .flatten()
            .cloned()
    }

    pub fn set_value(&self, value: &Tensor) -> Result<(), GraphError> {
        self.graph
            .borrow_mut()
            .set_node_value(self.node_id, Some(value))
    }

    pub fn value_expected_shape(&self) -> Result<Vec<usize>, GraphError> {
        self.graph.borrow().get_node_value_expected_shape(self.node_id)
    }

    pub fn grad(&self) -> Result<Option<Tensor>, GraphError> {
        self.graph.borrow().get_node_grad(self.node_id)
    }

    /// 标量节点的值（形状[1, 1]），常用于读取损失
    pub fn item(&self) -> Result<f32, GraphError> {
        let inner = self.graph.borrow();
        let value = inner.get_node_value(self.node_id)?.ok_or_else(|| {
            GraphError::ComputationError(format!(
                "节点{:?}尚未有值，无法读取标量",
                self.node_id
            ))
        })?;
        if !value.is_scalar() {
            return Err(GraphError::ComputationError(format!(
                "节点{:?}的值形状为{:?}，不是标量",
                self.node_id,
                value.shape()
            )));
        }
        Ok(value[[0, 0]])
    }

    // ========== 前向/反向 ==========

    pub fn forward(&self) -> Result<(), GraphError> {
        self.graph.borrow_mut().forward(self.node_id)
    }

    /// 以本节点为损失做反向传播（若尚未前向会先前向），返回损失值
    pub fn backward(&self) -> Result<f32, GraphError> {
        let mut inner = self.graph.borrow_mut();
        if !inner.has_node_value(self.node_id)? {
            inner.forward(self.node_id)?;
        }
        inner.backward(self.node_id)
    }

    // ========== 梯度开关 ==========

    /// 让反向传播把梯度一路传到本输入节点（仅对数据输入有效）
    pub fn set_requires_grad(&self, requires_grad: bool) -> Result<(), GraphError> {
        self.graph
            .borrow_mut()
            .set_node_requires_grad(self.node_id, requires_grad)
    }

    pub fn detach(&self) -> Result<(), GraphError> {
        self.graph.borrow_mut().detach_node(self.node_id)
    }

    pub fn attach(&self) -> Result<(), GraphError> {
        self.graph.borrow_mut().attach_node(self.node_id)
    }

    // ========== 算术 ==========

    pub fn try_add(&self, other: &Self) -> Result<Self, GraphError> {
        let id = self
            .graph
            .borrow_mut()
            .new_add_node(&[self.node_id, other.node_id], None)?;
        Ok(Self::new(id, Rc::clone(&self.graph)))
    }
}

impl std::ops::Add for &Var {
    type Output = Var;

    fn add(self, rhs: &Var) -> Var {
        self.try_add(rhs).expect("创建 Add 节点失败")
    }
}

impl std::ops::Add<Var> for &Var {
    type Output = Var;

    fn add(self, rhs: Var) -> Var {
        self + &rhs
    }
}

impl std::ops::Add<&Var> for Var {
    type Output = Var;

    fn add(self, rhs: &Var) -> Var {
        &self + rhs
    }
}

impl std::ops::Add for Var {
    type Output = Var;

    fn add(self, rhs: Var) -> Var {
        &self + &rhs
    }
}
