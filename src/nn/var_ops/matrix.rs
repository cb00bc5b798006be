use crate::nn::graph::GraphError;
use crate::nn::var::Var;
use std::rc::Rc;

pub trait VarMatrixOps {
    /// 矩阵乘法：self[m, n] × other[n, p] → [m, p]
    fn matmul(&self, other: &Var) -> Result<Var, GraphError>;
}

impl VarMatrixOps for Var {
    fn matmul(&self, other: &Var) -> Result<Var, GraphError> {
        let id = self
            .graph()
            .borrow_mut()
            .new_mat_mul_node(self.node_id(), other.node_id(), None)?;
        Ok(Var::new(id, Rc::clone(self.graph())))
    }
}
