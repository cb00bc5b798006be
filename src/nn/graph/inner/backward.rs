/*
 * @Author       : 老董
 * @Date         : 2026-08-11
 * @Description  : GraphInner VJP 反向传播
 */

use super::super::error::GraphError;
use super::GraphInner;
use crate::nn::NodeId;
use crate::nn::nodes::NodeType;
use crate::tensor::Tensor;
use std::collections::HashSet;

impl GraphInner {
    /// 反向传播
    pub fn backward(&mut self, loss: NodeId) -> Result<f32, GraphError> {
        self.backward_ex(loss, false)
    }

    /// 反向传播（扩展版本）。`retain_graph`为false时传播结束后释放中间结果
    pub fn backward_ex(&mut self, loss: NodeId, retain_graph: bool) -> Result<f32, GraphError> {
        let loss_node = self.get_node(loss)?;
        let loss_value = loss_node.value().ok_or_else(|| {
            GraphError::ComputationError(format!("损失{loss_node}没有值，请先执行 forward"))
        })?;

        let loss_scalar = loss_value.get_data_number().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "无法从损失节点获取标量值，形状: {:?}",
                loss_value.shape()
            ))
        })?;

        self.backward_vjp_core(loss)?;

        if !retain_graph {
            self.release_intermediate_results()?;
        }

        Ok(loss_scalar)
    }

    /// VJP 反向传播核心实现
    fn backward_vjp_core(&mut self, loss_id: NodeId) -> Result<(), GraphError> {
        self.reset_intermediate_grad();

        let loss_node = self.get_node(loss_id)?;
        let loss_value = loss_node.value().ok_or_else(|| {
            GraphError::ComputationError(format!("损失{loss_node}没有值，请先执行 forward"))
        })?;

        if loss_value.size() != 1 {
            return Err(GraphError::InvalidOperation(format!(
                "反向传播要求损失为标量 [1, 1]，但得到 {:?}",
                loss_value.shape()
            )));
        }

        // 种子梯度 dL/dL = 1
        let loss_grad = Tensor::ones(&[1, 1]);
        self.get_node_mut(loss_id)?.set_grad(Some(&loss_grad))?;

        let topo_order = self.topological_sort_backward(loss_id)?;

        for node_id in &topo_order {
            self.propagate_grad_to_parents(*node_id)?;
        }

        self.last_backward_pass_id += 1;
        let new_pass_id = self.last_backward_pass_id;

        for node_id in topo_order {
            if let Ok(node) = self.get_node_mut(node_id) {
                if node.grad().is_some() {
                    node.set_last_backward_pass_id(new_pass_id);
                }
            }
        }

        Ok(())
    }

    /// 将梯度从当前节点传播到其父节点
    fn propagate_grad_to_parents(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        {
            let node = self.get_node(node_id)?;
            if node.is_detached() {
                return Ok(());
            }
        }

        let parent_ids = self.get_node_parents(node_id)?;
        if parent_ids.is_empty() {
            return Ok(());
        }

        let parent_grads: Vec<(NodeId, Tensor)> = {
            let node = self.get_node(node_id)?;
            let upstream_grad = match node.grad() {
                Some(g) => g,
                None => return Ok(()),
            };

            let mut grads = Vec::with_capacity(parent_ids.len());
            for parent_id in &parent_ids {
                let parent = self.get_node(*parent_id)?;

                // 输入节点默认不参与梯度计算，被watch（requires_grad）的除外
                if let NodeType::Input(input) = parent.node_type() {
                    if !input.requires_grad() {
                        continue;
                    }
                }

                let assistant_parent_id =
                    parent_ids.iter().find(|&&id| id != *parent_id).copied();
                let assistant = assistant_parent_id
                    .map(|id| self.get_node(id))
                    .transpose()?;

                let parent_grad = node.calc_grad_to_parent(parent, upstream_grad, assistant)?;
                grads.push((*parent_id, parent_grad));
            }
            grads
        };

        for (parent_id, parent_grad) in parent_grads {
            let parent_node = self.get_node_mut(parent_id)?;

            if parent_node.is_detached() {
                continue;
            }

            // 多个下游路径的梯度相加累积
            if let Some(existing_grad) = parent_node.grad() {
                let new_grad = existing_grad + &parent_grad;
                parent_node.set_grad(Some(&new_grad))?;
            } else {
                parent_node.set_grad(Some(&parent_grad))?;
            }
        }

        Ok(())
    }

    /// 拓扑排序（反向）：从损失节点出发的DFS先序
    fn topological_sort_backward(&self, loss_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();

        fn dfs(
            graph: &GraphInner,
            node_id: NodeId,
            visited: &mut HashSet<NodeId>,
            result: &mut Vec<NodeId>,
        ) -> Result<(), GraphError> {
            if visited.contains(&node_id) {
                return Ok(());
            }
            visited.insert(node_id);
            result.push(node_id);

            let parents = graph.get_node_parents(node_id)?;
            for parent_id in parents {
                dfs(graph, parent_id, visited, result)?;
            }

            Ok(())
        }

        dfs(self, loss_id, &mut visited, &mut result)?;
        Ok(result)
    }

    /// 清除所有节点的梯度
    pub fn clear_grad(&mut self) -> Result<(), GraphError> {
        for node in self.nodes.values_mut() {
            let _ = node.clear_grad();
        }
        Ok(())
    }

    /// 清零梯度（PyTorch 风格）
    pub fn zero_grad(&mut self) -> Result<(), GraphError> {
        self.clear_grad()
    }
}
