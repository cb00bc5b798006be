use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 2维矩阵乘法节点
///
/// forward: C = A @ B，[m,n] @ [n,p] = [m,p]
/// backward: dL/dA = G @ Bᵀ，dL/dB = Aᵀ @ G
#[derive(Clone)]
pub(crate) struct MatMul {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    parents_ids: Vec<NodeId>, // NOTE: 注意顺序，[左操作数, 右操作数]
}

impl MatMul {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "MatMul节点需要恰好2个父节点".to_string(),
            ));
        }

        let left_shape = parents[0].value_expected_shape();
        let right_shape = parents[1].value_expected_shape();
        if left_shape.len() != 2 || right_shape.len() != 2 {
            return Err(GraphError::InvalidOperation(format!(
                "MatMul节点的父节点必须是2维矩阵，但得到{left_shape:?}和{right_shape:?}"
            )));
        }
        if left_shape[1] != right_shape[0] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![left_shape[0], right_shape[1]],
                got: vec![left_shape[1], right_shape[0]],
                message: format!(
                    "MatMul的两个父节点形状不兼容：左矩阵列数({})与右矩阵行数({})不相等",
                    left_shape[1], right_shape[0],
                ),
            });
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![left_shape[0], right_shape[1]],
            parents_ids: vec![parents[0].id(), parents[1].id()],
        })
    }
}

impl TraitNode for MatMul {
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
        let left_value = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;
        let right_value = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[1]
            ))
        })?;

        self.value = Some(left_value.mat_mul(right_value));
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
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        let other = assistant_parent.ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}计算梯度时需要另一个父节点的值",
                self.display_node()
            ))
        })?;
        let other_value = other.value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值，无法计算梯度",
                self.display_node(),
                other
            ))
        })?;

        if target_parent.id() == self.parents_ids[0] {
            // C = A @ B 对 A 的梯度：G @ Bᵀ
            Ok(upstream_grad.mat_mul(&other_value.transpose()))
        } else if target_parent.id() == self.parents_ids[1] {
            // C = A @ B 对 B 的梯度：Aᵀ @ G
            Ok(other_value.transpose().mat_mul(upstream_grad))
        } else {
            Err(GraphError::ComputationError(format!(
                "节点id `{:?}` 不是{}的父节点",
                target_parent.id(),
                self.display_node()
            )))
        }
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
