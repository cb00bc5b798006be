use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 按通道偏置加法节点（卷积层的bias）
///
/// forward: y[b,c,i,j] = x[b,c,i,j] + bias[c]，输入4维[batch, C, H, W]，
///          bias形状[C]或[1, C]
/// backward: 对输入的梯度 = 上游梯度；
///           对bias的梯度 = 上游梯度在(batch, H, W)上按通道求和
#[derive(Clone)]
pub(crate) struct ChannelBiasAdd {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    bias_shape: Vec<usize>,
    parents_ids: Vec<NodeId>, // [输入, bias]
}

impl ChannelBiasAdd {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "ChannelBiasAdd节点需要恰好2个父节点：[输入, bias]".to_string(),
            ));
        }

        let input_shape = parents[0].value_expected_shape().to_vec();
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: format!(
                    "ChannelBiasAdd的输入必须是4维[batch, C, H, W]，但得到{input_shape:?}"
                ),
            });
        }

        let channels = input_shape[1];
        let bias_shape = parents[1].value_expected_shape().to_vec();
        let bias_channels = match bias_shape.as_slice() {
            [c] => *c,
            [1, c] => *c,
            _ => {
                return Err(GraphError::InvalidOperation(format!(
                    "bias形状必须是[C]或[1, C]，但得到{bias_shape:?}"
                )));
            }
        };
        if bias_channels != channels {
            return Err(GraphError::ShapeMismatch {
                expected: vec![channels],
                got: vec![bias_channels],
                message: "bias的通道数与输入的通道数不一致".to_string(),
            });
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: input_shape,
            bias_shape,
            parents_ids: vec![parents[0].id(), parents[1].id()],
        })
    }
}

impl TraitNode for ChannelBiasAdd {
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
        let input = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;
        let bias = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[1]
            ))
        })?;

        let (batch, channels, height, width) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let bias_data = bias.data_as_slice();

        let mut result = input.clone();
        for b in 0..batch {
            for c in 0..channels {
                let bias_value = bias_data[c];
                for i in 0..height {
                    for j in 0..width {
                        result[[b, c, i, j]] += bias_value;
                    }
                }
            }
        }

        self.value = Some(result);
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
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        if target_parent.id() == self.parents_ids[0] {
            // 对输入的局部导数是1
            Ok(upstream_grad.clone())
        } else if target_parent.id() == self.parents_ids[1] {
            // 对bias：按通道把(batch, H, W)上的上游梯度求和
            let (batch, channels, height, width) =
                (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
            let mut sums = vec![0.0f32; channels];
            for b in 0..batch {
                for c in 0..channels {
                    for i in 0..height {
                        for j in 0..width {
                            sums[c] += upstream_grad[[b, c, i, j]];
                        }
                    }
                }
            }
            Ok(Tensor::new(&sums, &self.bias_shape))
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
