use crate::nn::graph::GraphError;
use crate::nn::module::Module;
use crate::nn::var::Var;
use std::rc::Rc;

/// Dropout层（inverted dropout）：训练时以rate概率置零并按1/(1-rate)放大，
/// eval模式下为恒等映射。本层没有可训练参数。
pub struct Dropout {
    rate: f32,
}

impl Dropout {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }

    pub fn forward(&self, input: &Var) -> Result<Var, GraphError> {
        let id = input
            .graph()
            .borrow_mut()
            .new_dropout_node(input.node_id(), self.rate, None)?;
        Ok(Var::new(id, Rc::clone(input.graph())))
    }
}

impl Module for Dropout {
    fn parameters(&self) -> Vec<Var> {
        Vec::new()
    }
}
