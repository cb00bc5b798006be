/*
 * @Author       : 老董
 * @Date         : 2026-08-13
 * @Description  : Conv2d层。支持Valid/Same两种padding模式：
 *                 Same模式下输出尺寸为ceil(in/stride)，不足处按
 *                 "上小下大、左小右大"的非对称方式补零。
 */

use crate::nn::graph::{Graph, GraphError};
use crate::nn::module::Module;
use crate::nn::var::{Init, Var};
use std::rc::Rc;

/// padding模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// 不补零，输出尺寸为 (in - kernel) / stride + 1
    Valid,
    /// 补零使输出尺寸为 ceil(in / stride)
    Same,
}

pub struct Conv2d {
    kernel: Var,
    bias: Option<Var>,
    stride: (usize, usize),
    padding: Padding,
}

impl Conv2d {
    /// 创建卷积层，卷积核形状为[out_channels, in_channels, kh, kw]，
    /// 用Kaiming初始化；bias形状为[1, out_channels]，初始化为0
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &Graph,
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
        bias: bool,
        name: &str,
    ) -> Result<Self, GraphError> {
        let kernel = graph.parameter(
            &[out_channels, in_channels, kernel_size.0, kernel_size.1],
            Init::Kaiming,
            Some(&format!("{name}_kernel")),
        )?;
        let bias = if bias {
            Some(graph.parameter(
                &[1, out_channels],
                Init::Zeros,
                Some(&format!("{name}_bias")),
            )?)
        } else {
            None
        };
        Ok(Self {
            kernel,
            bias,
            stride,
            padding,
        })
    }

    pub fn forward(&self, input: &Var) -> Result<Var, GraphError> {
        let input_shape = input.value_expected_shape()?;
        let kernel_shape = self.kernel.value_expected_shape()?;
        let padding = match self.padding {
            Padding::Valid => (0, 0, 0, 0),
            Padding::Same => {
                let (top, bottom) =
                    Self::same_padding(input_shape[2], kernel_shape[2], self.stride.0);
                let (left, right) =
                    Self::same_padding(input_shape[3], kernel_shape[3], self.stride.1);
                (top, bottom, left, right)
            }
        };

        let mut graph = input.graph().borrow_mut();
        let conv_id =
            graph.new_conv2d_node(input.node_id(), self.kernel.node_id(), self.stride, padding, None)?;
        let out_id = match &self.bias {
            Some(bias) => graph.new_channel_bias_add_node(conv_id, bias.node_id(), None)?,
            None => conv_id,
        };
        drop(graph);
        Ok(Var::new(out_id, Rc::clone(input.graph())))
    }

    /// Same模式下某一维的(前, 后)补零量。
    /// 输出为ceil(in/stride)，总补零量为max((out-1)*stride + kernel - in, 0)，
    /// 前侧取一半（向下取整），剩余归后侧。
    fn same_padding(in_size: usize, kernel: usize, stride: usize) -> (usize, usize) {
        let out_size = in_size.div_ceil(stride);
        let total = ((out_size - 1) * stride + kernel).saturating_sub(in_size);
        (total / 2, total - total / 2)
    }
}

impl Module for Conv2d {
    fn parameters(&self) -> Vec<Var> {
        let mut params = vec![self.kernel.clone()];
        if let Some(bias) = &self.bias {
            params.push(bias.clone());
        }
        params
    }
}
