use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use rayon::prelude::*;

/// Softmax 节点（按行，即对最后一维归一化）
///
/// forward: y_i = exp(x_i - max(x)) / Σ exp(x_j - max(x))（减最大值保证数值稳定）
/// backward: dL/dx_i = y_i * (dL/dy_i - ⟨dL/dy, y⟩)
#[derive(Clone)]
pub(crate) struct Softmax {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
}

impl Softmax {
    pub(crate) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Softmax节点只需要1个父节点".to_string(),
            ));
        }
        let shape = parents[0].value_expected_shape().to_vec();
        if shape.len() != 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!("Softmax节点要求2维输入[batch, features]，但得到{shape:?}"),
            });
        }

        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape,
        })
    }
}

impl TraitNode for Softmax {
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

        let (rows, cols) = (self.shape[0], self.shape[1]);
        let input = parent_value.data_as_slice();

        // 逐行并行计算
        let data: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map(|r| {
                let row = &input[r * cols..(r + 1) * cols];
                let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exps: Vec<f32> = row.iter().map(|&x| (x - max).exp()).collect();
                let sum: f32 = exps.iter().sum();
                exps.into_iter().map(|e| e / sum).collect::<Vec<f32>>()
            })
            .collect();

        self.value = Some(Tensor::new(&data, &self.shape));
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
        let y = self.value.as_ref().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}没有值，无法计算梯度",
                self.display_node()
            ))
        })?;

        let (rows, cols) = (self.shape[0], self.shape[1]);
        let y_data = y.data_as_slice();
        let g_data = upstream_grad.data_as_slice();

        let data: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map(|r| {
                let y_row = &y_data[r * cols..(r + 1) * cols];
                let g_row = &g_data[r * cols..(r + 1) * cols];
                let dot: f32 = y_row.iter().zip(g_row.iter()).map(|(a, b)| a * b).sum();
                y_row
                    .iter()
                    .zip(g_row.iter())
                    .map(|(&yi, &gi)| yi * (gi - dot))
                    .collect::<Vec<f32>>()
            })
            .collect();

        Ok(Tensor::new(&data, &self.shape))
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }
}
