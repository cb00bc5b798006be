use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// Leaky ReLU 激活函数节点
///
/// forward: f(x) = x if x > 0, else negative_slope * x
/// backward: d(f)/dx = 1 if x > 0, else negative_slope
///
/// 当 negative_slope = 0 时，等价于标准 ReLU
#[derive(Clone)]
pub(crate) struct LeakyReLU {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    /// 负半轴斜率，默认 0.0（标准 ReLU）
    negative_slope: f64,
    /// 缓存父节点的值（用于反向传播时判断梯度）
    parent_value: Option<Tensor>,
}

impl LeakyReLU {
    pub(crate) fn new(parents: &[&NodeHandle], negative_slope: f64) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "LeakyReLU节点只需要1个父节点".to_string(),
            ));
        }
        if negative_slope < 0.0 {
            return Err(GraphError::InvalidOperation(format!(
                "LeakyReLU的negative_slope应为非负数，但得到: {negative_slope}"
            )));
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            negative_slope,
            parent_value: None,
        })
    }
}

impl TraitNode for LeakyReLU {
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

        // 缓存父节点的值（用于反向传播）
        self.parent_value = Some(parent_value.clone());

        let slope = self.negative_slope as f32;
        let result = parent_value.where_with_f32(
            |x| x > 0.0,
            |x| x,         // x > 0 时保持原值
            |x| slope * x, // x <= 0 时乘以 slope
        );
        self.value = Some(result);

        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        self.parent_value = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        let parent_value = self.parent_value.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有缓存的父节点值，无法计算梯度",
                self.display_node()
            ))
        })?;

        // 局部梯度（逐元素）：x > 0 时为 1，否则为 negative_slope
        let slope = self.negative_slope as f32;
        let local_grad = parent_value.where_with_f32(|x| x > 0.0, |_| 1.0, |_| slope);

        Ok(upstream_grad * &local_grad)
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
