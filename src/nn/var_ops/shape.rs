use crate::nn::var::Var;
use std::rc::Rc;

pub trait VarShapeOps {
    /// 把[batch, ...]展平为[batch, features]
    fn flatten(&self) -> Var;
}

impl VarShapeOps for Var {
    fn flatten(&self) -> Var {
        let id = self
            .graph()
            .borrow_mut()
            .new_flatten_node(self.node_id(), true, None)
            .expect("创建 Flatten 节点失败");
        Var::new(id, Rc::clone(self.graph()))
    }
}
