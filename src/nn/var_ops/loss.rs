use crate::nn::graph::GraphError;
use crate::nn::nodes::Reduction;
use crate::nn::var::Var;
use std::rc::Rc;

pub trait VarLossOps {
    /// MSE损失（对所有元素取均值），结果为[1, 1]的标量节点
    fn mse_loss(&self, target: &Var) -> Result<Var, GraphError>;
    fn mse_loss_with_reduction(
        &self,
        target: &Var,
        reduction: Reduction,
    ) -> Result<Var, GraphError>;
}

impl VarLossOps for Var {
    fn mse_loss(&self, target: &Var) -> Result<Var, GraphError> {
        self.mse_loss_with_reduction(target, Reduction::Mean)
    }

    fn mse_loss_with_reduction(
        &self,
        target: &Var,
        reduction: Reduction,
    ) -> Result<Var, GraphError> {
        let id = self.graph().borrow_mut().new_mse_loss_node_with_reduction(
            self.node_id(),
            target.node_id(),
            reduction,
            None,
        )?;
        Ok(Var::new(id, Rc::clone(self.graph())))
    }
}
