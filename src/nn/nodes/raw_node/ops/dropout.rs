use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Dropout 节点（inverted dropout）
///
/// 训练模式：每个元素以概率 rate 置 0，保留的元素乘以 1/(1-rate)，
///           使输出的期望与输入一致；掩码被缓存，反向传播时按掩码传梯度。
/// 推理模式：恒等映射（掩码为空），与batch内容和rng状态无关。
#[derive(Clone)]
pub(crate) struct Dropout {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    rate: f32,
    training: bool,
    /// 节点自有的rng。创建时从图的rng派生种子（若图有种子），否则走系统熵
    rng: StdRng,
    /// 缓存：本次前向使用的掩码（已含1/(1-rate)缩放）
    mask: Option<Tensor>,
}

impl Dropout {
    pub(crate) fn new(
        parents: &[&NodeHandle],
        rate: f32,
        seed: Option<u64>,
    ) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Dropout节点只需要1个父节点".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&rate) {
            return Err(GraphError::InvalidOperation(format!(
                "Dropout的rate必须在[0, 1)内，但得到{rate}"
            )));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape: parents[0].value_expected_shape().to_vec(),
            rate,
            training: true,
            rng,
            mask: None,
        })
    }
}

impl TraitNode for Dropout {
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

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError> {
        let parent_value = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;

        if self.training && self.rate > 0.0 {
            let keep_scale = 1.0 / (1.0 - self.rate);
            let mask_data: Vec<f32> = (0..parent_value.size())
                .map(|_| {
                    if self.rng.r#gen::<f32>() < self.rate {
                        0.0
                    } else {
                        keep_scale
                    }
                })
                .collect();
            let mask = Tensor::new(&mask_data, &self.shape);
            self.value = Some(parent_value * &mask);
            self.mask = Some(mask);
        } else {
            self.value = Some(parent_value.clone());
            self.mask = None;
        }

        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        self.mask = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        _target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        match &self.mask {
            Some(mask) => Ok(upstream_grad * mask),
            // 恒等映射（推理模式或rate=0）
            None => Ok(upstream_grad.clone()),
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
