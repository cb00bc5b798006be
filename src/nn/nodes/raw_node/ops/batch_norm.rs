/*
 * @Author       : 老董
 * @Date         : 2026-08-12
 * @Description  : BatchNorm 节点（按通道归一化）
 *
 * 4维输入 [batch, C, H, W] 按通道（轴1）归一化，2维输入 [batch, C] 按特征归一化。
 * 训练模式：使用当前batch的统计量归一化，并以动量更新 running mean/var；
 * 推理模式：使用 running mean/var 归一化（结果与batch内容无关，保证确定性）。
 * 默认超参对齐 Keras：momentum = 0.99，epsilon = 1e-3。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::rc::Rc;

/// BatchNorm的running统计量。由层持有，
/// 层的每次forward新建的节点通过`Rc<RefCell<_>>`共享同一份，
/// 因此训练链上积累的统计量对之后新搭的推理链同样可见。
#[derive(Clone)]
pub(crate) struct RunningStats {
    mean: Vec<f32>,
    var: Vec<f32>,
}

impl RunningStats {
    /// 初始：均值0、方差1
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            mean: vec![0.0; channels],
            var: vec![1.0; channels],
        }
    }

    pub(crate) fn channels(&self) -> usize {
        self.mean.len()
    }
}

#[derive(Clone)]
pub(crate) struct BatchNorm {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    channels: usize,
    /// 每个通道内参与统计的元素个数（batch * H * W 或 batch）
    elems_per_channel: usize,
    momentum: f32,
    eps: f32,
    training: bool,
    stats: Rc<RefCell<RunningStats>>,
    /// 缓存：归一化后的 x_hat（反向传播用）
    normalized: Option<Tensor>,
    /// 缓存：本次前向使用的 1/sqrt(var + eps)（按通道）
    std_inv: Vec<f32>,
    /// 缓存：本次前向是否使用了batch统计量（决定反向公式）
    used_batch_stats: bool,
    parents_ids: Vec<NodeId>, // [输入, gamma, beta]
}

impl BatchNorm {
    pub(crate) fn new(
        parents: &[&NodeHandle],
        momentum: f32,
        eps: f32,
        shared_stats: Option<Rc<RefCell<RunningStats>>>,
    ) -> Result<Self, GraphError> {
        if parents.len() != 3 {
            return Err(GraphError::InvalidOperation(
                "BatchNorm节点需要恰好3个父节点：[输入, gamma, beta]".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&momentum) {
            return Err(GraphError::InvalidOperation(format!(
                "BatchNorm的momentum必须在[0, 1)内，但得到{momentum}"
            )));
        }
        if eps <= 0.0 {
            return Err(GraphError::InvalidOperation(format!(
                "BatchNorm的epsilon必须大于0，但得到{eps}"
            )));
        }

        let shape = parents[0].value_expected_shape().to_vec();
        let (channels, elems_per_channel) = match shape.as_slice() {
            [b, c] => (*c, *b),
            [b, c, h, w] => (*c, b * h * w),
            _ => {
                return Err(GraphError::DimensionMismatch {
                    expected: 4,
                    got: shape.len(),
                    message: format!(
                        "BatchNorm的输入必须是2维[batch, C]或4维[batch, C, H, W]，但得到{shape:?}"
                    ),
                });
            }
        };

        // gamma/beta形状须是[1, C]或[C]
        for (role, parent) in [("gamma", parents[1]), ("beta", parents[2])] {
            let p_shape = parent.value_expected_shape();
            let p_channels = match p_shape {
                [c] => *c,
                [1, c] => *c,
                _ => {
                    return Err(GraphError::InvalidOperation(format!(
                        "BatchNorm的{role}形状必须是[C]或[1, C]，但得到{p_shape:?}"
                    )));
                }
            };
            if p_channels != channels {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![channels],
                    got: vec![p_channels],
                    message: format!("BatchNorm的{role}通道数与输入的通道数不一致"),
                });
            }
        }

        let stats = match shared_stats {
            Some(stats) => {
                let stats_channels = stats.borrow().channels();
                if stats_channels != channels {
                    return Err(GraphError::ShapeMismatch {
                        expected: vec![channels],
                        got: vec![stats_channels],
                        message: "BatchNorm的running统计量通道数与输入的通道数不一致".to_string(),
                    });
                }
                stats
            }
            None => Rc::new(RefCell::new(RunningStats::new(channels))),
        };

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape,
            channels,
            elems_per_channel,
            momentum,
            eps,
            training: true,
            stats,
            normalized: None,
            std_inv: vec![0.0; channels],
            used_batch_stats: false,
            parents_ids: vec![parents[0].id(), parents[1].id(), parents[2].id()],
        })
    }

    /// 通道c的第k个元素在行优先存储中的下标。
    /// k按(batch, 通道内空间位置)展开：k = b * inner + s。
    fn flat_index(&self, c: usize, k: usize) -> usize {
        let inner: usize = self.shape[2..].iter().product::<usize>().max(1);
        let b = k / inner;
        let s = k % inner;
        (b * self.channels + c) * inner + s
    }
}

impl TraitNode for BatchNorm {
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
        let input = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[0]
            ))
        })?;
        let gamma = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的gamma{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[1]
            ))
        })?;
        let beta = parents[2].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的beta{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[2]
            ))
        })?;

        let x = input.data_as_slice();
        let gamma_data = gamma.data_as_slice();
        let beta_data = beta.data_as_slice();
        let m = self.elems_per_channel as f32;

        // 1. 选取归一化统计量
        let (means, vars) = if self.training {
            let mut means = vec![0.0f32; self.channels];
            let mut vars = vec![0.0f32; self.channels];
            for c in 0..self.channels {
                let mut sum = 0.0;
                for k in 0..self.elems_per_channel {
                    sum += x[self.flat_index(c, k)];
                }
                let mean = sum / m;
                let mut var_sum = 0.0;
                for k in 0..self.elems_per_channel {
                    let diff = x[self.flat_index(c, k)] - mean;
                    var_sum += diff * diff;
                }
                means[c] = mean;
                vars[c] = var_sum / m;
            }
            // 以动量更新 running 统计量
            let mut stats = self.stats.borrow_mut();
            for c in 0..self.channels {
                stats.mean[c] =
                    self.momentum * stats.mean[c] + (1.0 - self.momentum) * means[c];
                stats.var[c] =
                    self.momentum * stats.var[c] + (1.0 - self.momentum) * vars[c];
            }
            self.used_batch_stats = true;
            (means, vars)
        } else {
            self.used_batch_stats = false;
            let stats = self.stats.borrow();
            (stats.mean.clone(), stats.var.clone())
        };

        // 2. 归一化 + 仿射变换
        let mut normalized = vec![0.0f32; x.len()];
        let mut output = vec![0.0f32; x.len()];
        for c in 0..self.channels {
            let std_inv = 1.0 / (vars[c] + self.eps).sqrt();
            self.std_inv[c] = std_inv;
            for k in 0..self.elems_per_channel {
                let idx = self.flat_index(c, k);
                let x_hat = (x[idx] - means[c]) * std_inv;
                normalized[idx] = x_hat;
                output[idx] = gamma_data[c] * x_hat + beta_data[c];
            }
        }

        self.normalized = Some(Tensor::new(&normalized, &self.shape));
        self.value = Some(Tensor::new(&output, &self.shape));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        self.normalized = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        let x_hat = self.normalized.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有缓存的归一化值，无法计算梯度",
                self.display_node()
            ))
        })?;
        let x_hat_data = x_hat.data_as_slice();
        let g = upstream_grad.data_as_slice();
        let m = self.elems_per_channel as f32;

        if target_parent.id() == self.parents_ids[0] {
            // 对输入的梯度。需要gamma的值（assistant是参数列表中第一个非target的父节点，即gamma）
            let gamma_node = assistant_parent.ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}对输入求梯度时需要gamma的值",
                    self.display_node()
                ))
            })?;
            let gamma = gamma_node.value().ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}的gamma{}没有值，无法计算梯度",
                    self.display_node(),
                    gamma_node
                ))
            })?;
            let gamma_data = gamma.data_as_slice();

            let mut grad = vec![0.0f32; g.len()];
            for c in 0..self.channels {
                let scale = gamma_data[c] * self.std_inv[c];
                if self.used_batch_stats {
                    // 训练模式：均值/方差也是输入的函数，完整的VJP是
                    // dx = gamma*std_inv/m * (m*g - Σg - x_hat*Σ(g*x_hat))
                    let mut sum_g = 0.0;
                    let mut sum_g_xhat = 0.0;
                    for k in 0..self.elems_per_channel {
                        let idx = self.flat_index(c, k);
                        sum_g += g[idx];
                        sum_g_xhat += g[idx] * x_hat_data[idx];
                    }
                    for k in 0..self.elems_per_channel {
                        let idx = self.flat_index(c, k);
                        grad[idx] =
                            scale / m * (m * g[idx] - sum_g - x_hat_data[idx] * sum_g_xhat);
                    }
                } else {
                    // 推理模式：running统计量是常数，dx = g * gamma * std_inv
                    for k in 0..self.elems_per_channel {
                        let idx = self.flat_index(c, k);
                        grad[idx] = g[idx] * scale;
                    }
                }
            }
            Ok(Tensor::new(&grad, &self.shape))
        } else if target_parent.id() == self.parents_ids[1] {
            // dgamma_c = Σ(g * x_hat)（通道内求和）
            let mut grad = vec![0.0f32; self.channels];
            for c in 0..self.channels {
                for k in 0..self.elems_per_channel {
                    let idx = self.flat_index(c, k);
                    grad[c] += g[idx] * x_hat_data[idx];
                }
            }
            Ok(Tensor::new(&grad, target_parent.value_expected_shape()))
        } else if target_parent.id() == self.parents_ids[2] {
            // dbeta_c = Σg（通道内求和）
            let mut grad = vec![0.0f32; self.channels];
            for c in 0..self.channels {
                for k in 0..self.elems_per_channel {
                    grad[c] += g[self.flat_index(c, k)];
                }
            }
            Ok(Tensor::new(&grad, target_parent.value_expected_shape()))
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
