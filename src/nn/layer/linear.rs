use crate::nn::graph::{Graph, GraphError};
use crate::nn::module::Module;
use crate::nn::var::{Init, Var};
use crate::nn::var_ops::VarMatrixOps;

/// 全连接层：y = x · W + b，W形状[in_features, out_features]
pub struct Linear {
    graph: Graph,
    weights: Var,
    bias: Option<Var>,
}

impl Linear {
    pub fn new(
        graph: &Graph,
        in_features: usize,
        out_features: usize,
        bias: bool,
        name: &str,
    ) -> Result<Self, GraphError> {
        let weights = graph.parameter(
            &[in_features, out_features],
            Init::Kaiming,
            Some(&format!("{name}_weights")),
        )?;
        let bias = if bias {
            Some(graph.parameter(
                &[1, out_features],
                Init::Zeros,
                Some(&format!("{name}_bias")),
            )?)
        } else {
            None
        };
        Ok(Self {
            graph: graph.clone(),
            weights,
            bias,
        })
    }

    pub fn forward(&self, input: &Var) -> Result<Var, GraphError> {
        let out = input.matmul(&self.weights)?;
        match &self.bias {
            Some(bias) => {
                // bias是[1, out]，借助全1列向量[batch, 1]广播到整个batch
                let batch_size = input.value_expected_shape()?[0];
                let ones = self.graph.ones(&[batch_size, 1])?;
                Ok(&out + &ones.matmul(bias)?)
            }
            None => Ok(out),
        }
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<Var> {
        let mut params = vec![self.weights.clone()];
        if let Some(bias) = &self.bias {
            params.push(bias.clone());
        }
        params
    }
}
