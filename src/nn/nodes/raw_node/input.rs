use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 输入节点的用途
#[derive(Clone, Copy, PartialEq, Eq)]
pub(in crate::nn) enum InputKind {
    /// 数据输入（如图像）
    Data,
    /// 监督目标（如标签），永远不参与梯度计算
    Target,
}

/// 输入节点：叶子节点，值由外部通过 set_value 喂入。
///
/// 默认不参与梯度计算（反向传播到输入节点即停止）；
/// 数据输入可通过 `set_requires_grad(true)` 被"观察"，
/// 此后反向传播会把损失对该输入的梯度存在本节点上
/// （FGSM 等需要对输入求梯度的场景）。
#[derive(Clone)]
pub(in crate::nn) struct Input {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    kind: InputKind,
    requires_grad: bool,
}

impl Input {
    pub(in crate::nn) fn new(shape: &[usize], kind: InputKind) -> Result<Self, GraphError> {
        // 输入节点支持2~4维：[batch, features]、[batch, c, h, w]等
        if shape.len() < 2 || shape.len() > 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!("输入节点仅支持2~4维张量，但得到形状{shape:?}"),
            });
        }
        if shape.iter().any(|&s| s == 0) {
            return Err(GraphError::InvalidOperation(format!(
                "输入节点的形状不能含0维度，但得到{shape:?}"
            )));
        }
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: shape.to_vec(),
            kind,
            requires_grad: false,
        })
    }

    pub(in crate::nn) const fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub(in crate::nn) fn set_requires_grad(&mut self, requires_grad: bool) -> Result<(), GraphError> {
        if requires_grad && self.kind == InputKind::Target {
            return Err(GraphError::InvalidOperation(format!(
                "{}是目标（Target）输入，不支持对其求梯度",
                self.display_node()
            )));
        }
        self.requires_grad = requires_grad;
        Ok(())
    }
}

impl TraitNode for Input {
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
            "{}是输入节点，其值应通过set_value设置，而非由父节点计算",
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
