use crate::nn::var::Var;
use std::rc::Rc;

pub trait VarActivationOps {
    /// ReLU激活：max(0, x)
    fn relu(&self) -> Var;
    /// LeakyReLU激活：x>0时为x，否则为negative_slope*x
    fn leaky_relu(&self, negative_slope: f64) -> Var;
    /// 按行Softmax（输入须为[batch, features]）
    fn softmax(&self) -> Var;
}

impl VarActivationOps for Var {
    fn relu(&self) -> Var {
        let id = self
            .graph()
            .borrow_mut()
            .new_relu_node(self.node_id(), None)
            .expect("创建 ReLU 节点失败");
        Var::new(id, Rc::clone(self.graph()))
    }

    fn leaky_relu(&self, negative_slope: f64) -> Var {
        let id = self
            .graph()
            .borrow_mut()
            .new_leaky_relu_node(self.node_id(), negative_slope, None)
            .expect("创建 LeakyReLU 节点失败");
        Var::new(id, Rc::clone(self.graph()))
    }

    fn softmax(&self) -> Var {
        let id = self
            .graph()
            .borrow_mut()
            .new_softmax_node(self.node_id(), None)
            .expect("创建 Softmax 节点失败");
        Var::new(id, Rc::clone(self.graph()))
    }
}
