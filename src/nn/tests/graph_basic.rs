/*
 * @Author       : 老董
 * @Date         : 2026-08-15
 * @Description  : 图的基础功能测试（节点创建、命名、形状校验）
 */

use crate::assert_err;
use crate::nn::graph::{GraphError, GraphInner};
use crate::nn::nodes::NodeId;
use crate::tensor::Tensor;

#[test]
fn test_graph_creation() {
    let graph = GraphInner::new();
    assert_eq!(graph.name(), "default_graph");
    assert_eq!(graph.nodes_count(), 0);

    let named = GraphInner::with_name("my_graph");
    assert_eq!(named.name(), "my_graph");
}

#[test]
fn test_node_auto_naming() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let a = graph.new_basic_input_node(&[2, 2], None)?;
    let b = graph.new_basic_input_node(&[2, 2], None)?;
    assert_eq!(graph.get_node_name(a)?, "input_1");
    assert_eq!(graph.get_node_name(b)?, "input_2");

    let named = graph.new_basic_input_node(&[2, 2], Some("x"))?;
    assert_eq!(graph.get_node_name(named)?, "x");

    // 显式重名应报错
    let dup = graph.new_basic_input_node(&[2, 2], Some("x"));
    assert_err!(dup, GraphError::DuplicateNodeName { .. });
    Ok(())
}

#[test]
fn test_node_ids_are_sequential() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let a = graph.new_basic_input_node(&[1, 1], None)?;
    let b = graph.new_parameter_node(&[1, 1], None)?;
    assert_eq!(a, NodeId(1));
    assert_eq!(b, NodeId(2));
    Ok(())
}

#[test]
fn test_get_node_errors_for_unknown_id() {
    let graph = GraphInner::new();
    assert_err!(
        graph.get_node_value(NodeId(99)),
        GraphError::NodeNotFound(NodeId(99))
    );
}

#[test]
fn test_input_shape_validation() {
    let mut graph = GraphInner::new();
    // 1维、5维或带0的形状都不合法
    assert_err!(graph.new_basic_input_node(&[3], None));
    assert_err!(graph.new_basic_input_node(&[1, 2, 3, 4, 5], None));
    assert_err!(graph.new_basic_input_node(&[2, 0], None));
}

#[test]
fn test_set_value_shape_validation() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[2, 3], Some("x"))?;

    graph.set_node_value(x, Some(&Tensor::zeros(&[2, 3])))?;
    assert!(graph.has_node_value(x)?);

    let bad = graph.set_node_value(x, Some(&Tensor::zeros(&[3, 2])));
    assert_err!(bad, GraphError::ShapeMismatch { .. });
    Ok(())
}

#[test]
fn test_edges_are_wired_on_creation() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let y = graph.new_mat_mul_node(x, w, Some("y"))?;

    assert_eq!(graph.get_node_parents(y)?, vec![x, w]);
    assert_eq!(graph.get_node_children(x)?, vec![y]);
    assert_eq!(graph.get_node_children(w)?, vec![y]);
    Ok(())
}

#[test]
fn test_trainable_nodes_are_parameters_only() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let _x = graph.new_basic_input_node(&[1, 2], None)?;
    let w1 = graph.new_parameter_node(&[2, 2], None)?;
    let w2 = graph.new_parameter_node(&[2, 2], None)?;

    assert_eq!(graph.get_trainable_nodes(), vec![w1, w2]);
    Ok(())
}

/// 水位之后追加的临时子图可整体移除，之前的节点与边不受影响
#[test]
fn test_remove_nodes_since_watermark() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let before = graph.nodes_count();

    let watermark = graph.node_id_watermark();
    let pred = graph.new_mat_mul_node(x, w, None)?;
    let target = graph.new_target_input_node(&[1, 2], None)?;
    let loss = graph.new_mse_loss_node(pred, target, None)?;
    assert_eq!(graph.nodes_count(), before + 3);

    graph.remove_nodes_since(watermark);
    assert_eq!(graph.nodes_count(), before);

    // 被移除的节点不可再访问
    assert_err!(graph.get_node_value(pred), GraphError::NodeNotFound(_));
    assert_err!(graph.get_node_value(loss), GraphError::NodeNotFound(_));
    // 幸存节点的子节点表也被清理
    assert!(graph.get_node_children(x)?.is_empty());
    assert!(graph.get_node_children(w)?.is_empty());

    // 移除后可以重新搭链并正常前向
    graph.set_node_value(x, Some(&Tensor::new(&[1.0, 2.0], &[1, 2])))?;
    graph.set_node_value(w, Some(&Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2])))?;
    let pred2 = graph.new_mat_mul_node(x, w, None)?;
    graph.forward(pred2)?;
    assert_eq!(
        graph.get_node_value(pred2)?.unwrap(),
        &Tensor::new(&[1.0, 2.0], &[1, 2])
    );
    Ok(())
}
