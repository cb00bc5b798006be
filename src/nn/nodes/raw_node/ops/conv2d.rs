/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : 2D卷积节点（Batch-First，NCHW）
 *
 * 输入 [batch, C_in, H, W]，卷积核 [C_out, C_in, kH, kW]。
 * 填充为显式四元组（上,下,左,右），支持非对称填充，
 * 由此上层可以实现 Keras 风格的 "same" 填充（out = ceil(in / stride)）。
 *
 * 输出 H' = (H + pad_top + pad_bottom - kH) / stride_h + 1（向下取整），W'同理。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use rayon::prelude::*;

#[derive(Clone)]
pub(crate) struct Conv2d {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    /// (stride_h, stride_w)
    stride: (usize, usize),
    /// (上, 下, 左, 右)
    padding: (usize, usize, usize, usize),
    input_shape: Vec<usize>,
    kernel_shape: Vec<usize>,
    /// 输出形状 [batch, C_out, H', W']
    shape: Vec<usize>,
    /// 缓存填充后的输入（反向传播用）
    padded_input: Option<Tensor>,
    parents_ids: Vec<NodeId>, // [输入, 卷积核]
}

impl Conv2d {
    pub(crate) fn new(
        parents: &[&NodeHandle],
        stride: (usize, usize),
        padding: (usize, usize, usize, usize),
    ) -> Result<Self, GraphError> {
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "Conv2d节点需要恰好2个父节点：[输入, 卷积核]".to_string(),
            ));
        }
        if stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "Conv2d的stride必须大于0，但得到{stride:?}"
            )));
        }

        let input_shape = parents[0].value_expected_shape().to_vec();
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: format!("Conv2d的输入必须是4维[batch, C, H, W]，但得到{input_shape:?}"),
            });
        }

        let kernel_shape = parents[1].value_expected_shape().to_vec();
        if kernel_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: kernel_shape.len(),
                message: format!(
                    "Conv2d的卷积核必须是4维[C_out, C_in, kH, kW]，但得到{kernel_shape:?}"
                ),
            });
        }
        if input_shape[1] != kernel_shape[1] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![input_shape[1]],
                got: vec![kernel_shape[1]],
                message: "卷积核的输入通道数与输入的通道数不一致".to_string(),
            });
        }

        let (pad_top, pad_bottom, pad_left, pad_right) = padding;
        let padded_h = input_shape[2] + pad_top + pad_bottom;
        let padded_w = input_shape[3] + pad_left + pad_right;
        if padded_h < kernel_shape[2] || padded_w < kernel_shape[3] {
            return Err(GraphError::InvalidOperation(format!(
                "填充后的输入({padded_h}x{padded_w})小于卷积核({}x{})",
                kernel_shape[2], kernel_shape[3]
            )));
        }

        let out_h = (padded_h - kernel_shape[2]) / stride.0 + 1;
        let out_w = (padded_w - kernel_shape[3]) / stride.1 + 1;
        let shape = vec![input_shape[0], kernel_shape[0], out_h, out_w];

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            stride,
            padding,
            input_shape,
            kernel_shape,
            shape,
            padded_input: None,
            parents_ids: vec![parents[0].id(), parents[1].id()],
        })
    }

    /// 给输入做零填充，返回 [batch, C, H+pt+pb, W+pl+pr]
    fn pad_input(&self, input: &Tensor) -> Tensor {
        let (pad_top, pad_bottom, pad_left, pad_right) = self.padding;
        if pad_top == 0 && pad_bottom == 0 && pad_left == 0 && pad_right == 0 {
            return input.clone();
        }

        let (batch, channels, height, width) = (
            self.input_shape[0],
            self.input_shape[1],
            self.input_shape[2],
            self.input_shape[3],
        );
        let padded_h = height + pad_top + pad_bottom;
        let padded_w = width + pad_left + pad_right;

        let mut padded = Tensor::zeros(&[batch, channels, padded_h, padded_w]);
        for b in 0..batch {
            for c in 0..channels {
                for i in 0..height {
                    for j in 0..width {
                        padded[[b, c, i + pad_top, j + pad_left]] = input[[b, c, i, j]];
                    }
                }
            }
        }
        padded
    }
}

impl TraitNode for Conv2d {
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
        let kernel = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值。不该触及本错误，否则说明crate代码有问题",
                self.display_node(),
                parents[1]
            ))
        })?;

        let padded = self.pad_input(input);

        let (batch, out_channels, out_h, out_w) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let in_channels = self.input_shape[1];
        let (kernel_h, kernel_w) = (self.kernel_shape[2], self.kernel_shape[3]);
        let (stride_h, stride_w) = self.stride;

        // 按batch并行做互相关
        let data: Vec<f32> = (0..batch)
            .into_par_iter()
            .flat_map(|b| {
                let mut out = vec![0.0f32; out_channels * out_h * out_w];
                for co in 0..out_channels {
                    for i in 0..out_h {
                        for j in 0..out_w {
                            let mut sum = 0.0;
                            for ci in 0..in_channels {
                                for ki in 0..kernel_h {
                                    for kj in 0..kernel_w {
                                        sum += padded[[b, ci, i * stride_h + ki, j * stride_w + kj]]
                                            * kernel[[co, ci, ki, kj]];
                                    }
                                }
                            }
                            out[(co * out_h + i) * out_w + j] = sum;
                        }
                    }
                }
                out
            })
            .collect();

        self.padded_input = Some(padded);
        self.value = Some(Tensor::new(&data, &self.shape));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        self.padded_input = None;
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        assistant_parent: Option<&NodeHandle>,
    ) -> Result<Tensor, GraphError> {
        let padded = self.padded_input.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有缓存的填充输入，无法计算梯度",
                self.display_node()
            ))
        })?;

        let (batch, out_channels, out_h, out_w) =
            (self.shape[0], self.shape[1], self.shape[2], self.shape[3]);
        let in_channels = self.input_shape[1];
        let (kernel_h, kernel_w) = (self.kernel_shape[2], self.kernel_shape[3]);
        let (stride_h, stride_w) = self.stride;
        let (pad_top, _, pad_left, _) = self.padding;
        let (height, width) = (self.input_shape[2], self.input_shape[3]);
        let padded_h = padded.shape()[2];
        let padded_w = padded.shape()[3];

        if target_parent.id() == self.parents_ids[0] {
            // 对输入的梯度：把上游梯度经卷积核"散播"回填充后的输入位置，再裁掉填充
            let kernel_node = assistant_parent.ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}对输入求梯度时需要卷积核的值",
                    self.display_node()
                ))
            })?;
            let kernel = kernel_node.value().ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}的卷积核{}没有值，无法计算梯度",
                    self.display_node(),
                    kernel_node
                ))
            })?;

            let data: Vec<f32> = (0..batch)
                .into_par_iter()
                .flat_map(|b| {
                    let mut grad_padded = vec![0.0f32; in_channels * padded_h * padded_w];
                    for co in 0..out_channels {
                        for i in 0..out_h {
                            for j in 0..out_w {
                                let g = upstream_grad[[b, co, i, j]];
                                if g == 0.0 {
                                    continue;
                                }
                                for ci in 0..in_channels {
                                    for ki in 0..kernel_h {
                                        for kj in 0..kernel_w {
                                            let pi = i * stride_h + ki;
                                            let pj = j * stride_w + kj;
                                            grad_padded[(ci * padded_h + pi) * padded_w + pj] +=
                                                g * kernel[[co, ci, ki, kj]];
                                        }
                                    }
                                }
                            }
                        }
                    }
                    // 裁掉填充，只保留原输入区域
                    let mut grad_input = vec![0.0f32; in_channels * height * width];
                    for ci in 0..in_channels {
                        for i in 0..height {
                            for j in 0..width {
                                grad_input[(ci * height + i) * width + j] = grad_padded
                                    [(ci * padded_h + i + pad_top) * padded_w + j + pad_left];
                            }
                        }
                    }
                    grad_input
                })
                .collect();

            Ok(Tensor::new(&data, &self.input_shape))
        } else if target_parent.id() == self.parents_ids[1] {
            // 对卷积核的梯度：上游梯度与填充输入做互相关
            let data: Vec<f32> = (0..out_channels)
                .into_par_iter()
                .flat_map(|co| {
                    let mut grad_kernel = vec![0.0f32; in_channels * kernel_h * kernel_w];
                    for b in 0..batch {
                        for i in 0..out_h {
                            for j in 0..out_w {
                                let g = upstream_grad[[b, co, i, j]];
                                if g == 0.0 {
                                    continue;
                                }
                                for ci in 0..in_channels {
                                    for ki in 0..kernel_h {
                                        for kj in 0..kernel_w {
                                            grad_kernel[(ci * kernel_h + ki) * kernel_w + kj] += g
                                                * padded
                                                    [[b, ci, i * stride_h + ki, j * stride_w + kj]];
                                        }
                                    }
                                }
                            }
                        }
                    }
                    grad_kernel
                })
                .collect();

            Ok(Tensor::new(&data, &self.kernel_shape))
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
