use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 展平节点
///
/// forward: keep_first_dim 为 true 时 [b, d1, d2, ...] → [b, d1*d2*...]
///          （保留batch维度，CNN接全连接层的标准做法）；
///          为 false 时展平成 [1, total]
/// backward: 上游梯度按父节点形状 reshape 回去
#[derive(Clone)]
pub(crate) struct Flatten {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parent_shape: Vec<usize>,
}

impl Flatten {
    pub(crate) fn new(parents: &[&NodeHandle], keep_first_dim: bool) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Flatten节点只需要1个父节点".to_string(),
            ));
        }

        let parent_shape = parents[0].value_expected_shape().to_vec();
        let total: usize = parent_shape.iter().product();
        let shape = if keep_first_dim {
            vec![parent_shape[0], total / parent_shape[0]]
        } else {
            vec![1, total]
        };

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape,
            parent_shape,
        })
    }
}

impl TraitNode for Flatten {
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

    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError> {
        let parent_value = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;

        self.value = Some(parent_value.reshape(&self.shape));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        // 展平只是改变视图，梯度原样reshape回父节点形状
        Ok(upstream_grad.reshape(&self.parent_shape))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
