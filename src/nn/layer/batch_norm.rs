use crate::nn::graph::{Graph, GraphError};
use crate::nn::module::Module;
use crate::nn::nodes::RunningStats;
use crate::nn::var::{Init, Var};
use std::cell::RefCell;
use std::rc::Rc;

/// 批归一化层。gamma初始化为1、beta初始化为0。
/// running统计量（均值0、方差1起步）由层持有，
/// 每次forward新建的节点共享同一份——训练链上积累的统计量
/// 对之后新搭的推理链同样生效。
pub struct BatchNorm {
    gamma: Var,
    beta: Var,
    momentum: f32,
    eps: f32,
    stats: Rc<RefCell<RunningStats>>,
}

impl BatchNorm {
    pub const DEFAULT_MOMENTUM: f32 = 0.99;
    pub const DEFAULT_EPS: f32 = 1e-3;

    pub fn new(graph: &Graph, num_features: usize, name: &str) -> Result<Self, GraphError> {
        Self::new_with(
            graph,
            num_features,
            Self::DEFAULT_MOMENTUM,
            Self::DEFAULT_EPS,
            name,
        )
    }

    pub fn new_with(
        graph: &Graph,
        num_features: usize,
        momentum: f32,
        eps: f32,
        name: &str,
    ) -> Result<Self, GraphError> {
        let gamma = graph.parameter(
            &[1, num_features],
            Init::Ones,
            Some(&format!("{name}_gamma")),
        )?;
        let beta = graph.parameter(
            &[1, num_features],
            Init::Zeros,
            Some(&format!("{name}_beta")),
        )?;
        Ok(Self {
            gamma,
            beta,
            momentum,
            eps,
            stats: Rc::new(RefCell::new(RunningStats::new(num_features))),
        })
    }

    pub fn forward(&self, input: &Var) -> Result<Var, GraphError> {
        let id = input.graph().borrow_mut().new_batch_norm_node_with_stats(
            input.node_id(),
            self.gamma.node_id(),
            self.beta.node_id(),
            self.momentum,
            self.eps,
            Rc::clone(&self.stats),
            None,
        )?;
        Ok(Var::new(id, Rc::clone(input.graph())))
    }
}

impl Module for BatchNorm {
    fn parameters(&self) -> Vec<Var> {
        vec![self.gamma.clone(), self.beta.clone()]
    }
}
