use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// MSE损失的归约方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// 所有元素平方差的均值（默认）
    Mean,
    /// 所有元素平方差之和
    Sum,
}

/// MSE（均方误差）损失节点
///
/// forward: Mean时 L = Σ(pred - target)² / N，Sum时 L = Σ(pred - target)²，
///          输出标量 [1, 1]
/// backward: 对pred的梯度 = 2·(pred - target)/N（Mean）或 2·(pred - target)（Sum），
///           再乘上游标量梯度；不支持对target求梯度
#[derive(Clone)]
pub(crate) struct MseLoss {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    reduction: Reduction,
    /// 缓存：pred - target（反向传播用）
    diff: Option<Tensor>,
    parents_ids: Vec<NodeId>, // [预测, 目标]
}

impl MseLoss {
    pub(crate) fn new(parents: &[&NodeHandle], reduction: Reduction) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "MSELoss节点需要恰好2个父节点：[预测, 目标]".to_string(),
            ));
        }

        let pred_shape = parents[0].value_expected_shape();
        let target_shape = parents[1].value_expected_shape();
        if pred_shape != target_shape {
            return Err(GraphError::ShapeMismatch {
                expected: pred_shape.to_vec(),
                got: target_shape.to_vec(),
                message: "MSELoss的预测与目标形状必须一致".to_string(),
            });
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: vec![1, 1],
            reduction,
            diff: None,
            parents_ids: vec![parents[0].id(), parents[1].id()],
        })
    }
}

impl TraitNode for MseLoss {
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
        let pred = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;
        let target = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[1]
            ))
        })?;

        let diff = pred - target;
        let sum_sq: f32 = diff.data_as_slice().iter().map(|d| d * d).sum();
        let loss = match self.reduction {
            Reduction::Mean => sum_sq / diff.size() as f32,
            Reduction::Sum => sum_sq,
        };

        self.diff = Some(diff);
        self.value = Some(Tensor::new(&[loss], &[1, 1]));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        self.diff = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        if target_parent.id() == self.parents_ids[1] {
            return Err(GraphError::InvalidOperation(format!(
                "{}不支持对目标张量求梯度",
                self.display_node()
            )));
        }
        if target_parent.id() != self.parents_ids[0] {
            return Err(GraphError::ComputationError(format!(
                "节点id `{:?}` 不是{}的父节点",
                target_parent.id(),
                self.display_node()
            )));
        }

        let diff = self.diff.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有缓存的差值，无法计算梯度",
                self.display_node()
            ))
        })?;
        let upstream = upstream_grad.get_data_number().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的上游梯度应为标量，但形状为{:?}",
                self.display_node(),
                upstream_grad.shape()
            ))
        })?;

        let scale = match self.reduction {
            Reduction::Mean => 2.0 * upstream / diff.size() as f32,
            Reduction::Sum => 2.0 * upstream,
        };
        Ok(diff * scale)
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
