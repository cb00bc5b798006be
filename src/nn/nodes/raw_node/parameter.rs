use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 参数节点：可训练的叶子节点（权重、偏置、BatchNorm的gamma/beta等）。
/// 值在创建后由初始化器一次性设置，反向传播会把梯度累积在本节点上。
#[derive(Clone)]
pub(in crate::nn) struct Parameter {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl Parameter {
    pub(in crate::nn) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        if shape.is_empty() {
            return Err(GraphError::InvalidOperation(
                "参数节点的形状不能为空".to_string(),
            ));
        }
        if shape.iter().any(|&s| s == 0) {
            return Err(GraphError::InvalidOperation(format!(
                "参数节点的形状不能含0维度，但得到{shape:?}"
            )));
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for Parameter {
    fn id(&self) -> NodeId {
        self.id.unwrap()
    }

    fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        self.name.as_ref().unwrap()
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}是参数节点，其值应通过set_value设置，而非由父节点计算",
            self.display_node()
        )))
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(v) = value {
            if v.shape() != self.shape.as_slice() {
                return Err(GraphError::ShapeMismatch {
                    expected: self.shape.clone(),
                    got: v.shape().to_vec(),
                    message: format!("{}的值形状与节点预期形状不符", self.display_node()),
                });
            }
        }
        self.value = value.cloned();
        Ok(())
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _target_parent: &NodeHandle,
        _upstream_grad: &Tensor,
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}是叶子节点，没有父节点",
            self.display_node()
        )))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
