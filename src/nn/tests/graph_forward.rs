/*
 * @Author       : 老董
 * @Date         : 2026-08-15
 * @Description  : 前向传播测试（链式计算、记忆化、错误路径）
 */

use crate::assert_err;
use crate::nn::graph::{GraphError, GraphInner};
use crate::tensor::Tensor;

/// x[1,2] · w[2,2] → y，手算校验
#[test]
fn test_forward_mat_mul_chain() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let y = graph.new_mat_mul_node(x, w, Some("y"))?;

    graph.set_node_value(x, Some(&Tensor::new(&[1.0, 2.0], &[1, 2])))?;
    graph.set_node_value(w, Some(&Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2])))?;
    graph.forward(y)?;

    // [1, 2] · [[1, 2], [3, 4]] = [7, 10]
    let value = graph.get_node_value(y)?.unwrap();
    assert_eq!(value, &Tensor::new(&[7.0, 10.0], &[1, 2]));
    Ok(())
}

#[test]
fn test_forward_add_requires_same_shape() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let a = graph.new_basic_input_node(&[2, 2], Some("a"))?;
    let b = graph.new_basic_input_node(&[2, 3], Some("b"))?;
    assert_err!(
        graph.new_add_node(&[a, b], None),
        GraphError::ShapeMismatch { .. }
    );
    Ok(())
}

#[test]
fn test_forward_without_input_value_fails() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let y = graph.new_mat_mul_node(x, w, Some("y"))?;

    // x没有值，前向应失败
    graph.set_node_value(w, Some(&Tensor::ones(&[2, 2])))?;
    assert_err!(graph.forward(y), GraphError::InvalidOperation { .. });
    Ok(())
}

#[test]
fn test_forward_on_leaf_node() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;

    // 没有值的输入节点不能前向
    assert_err!(graph.forward(x));

    // 有值后前向是no-op
    graph.set_node_value(x, Some(&Tensor::ones(&[1, 2])))?;
    graph.forward(x)?;
    Ok(())
}

/// 每次 forward 调用推进一次pass id，同一轮内节点只计算一次
#[test]
fn test_forward_pass_id_advances() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let y = graph.new_mat_mul_node(x, w, Some("y"))?;

    graph.set_node_value(x, Some(&Tensor::ones(&[1, 2])))?;
    graph.set_node_value(w, Some(&Tensor::ones(&[2, 2])))?;

    assert_eq!(graph.last_forward_pass_id(), 0);
    graph.forward(y)?;
    assert_eq!(graph.last_forward_pass_id(), 1);
    graph.forward(y)?;
    assert_eq!(graph.last_forward_pass_id(), 2);
    Ok(())
}

/// 重新喂入输入值后再次前向，结果应随之更新
#[test]
fn test_forward_recomputes_after_new_value() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[1, 2], Some("x"))?;
    let w = graph.new_parameter_node(&[2, 2], Some("w"))?;
    let y = graph.new_mat_mul_node(x, w, Some("y"))?;

    graph.set_node_value(w, Some(&Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2])))?;

    graph.set_node_value(x, Some(&Tensor::new(&[1.0, 2.0], &[1, 2])))?;
    graph.forward(y)?;
    assert_eq!(
        graph.get_node_value(y)?.unwrap(),
        &Tensor::new(&[1.0, 2.0], &[1, 2])
    );

    graph.set_node_value(x, Some(&Tensor::new(&[3.0, 4.0], &[1, 2])))?;
    graph.forward(y)?;
    assert_eq!(
        graph.get_node_value(y)?.unwrap(),
        &Tensor::new(&[3.0, 4.0], &[1, 2])
    );
    Ok(())
}

/// Flatten把[batch, C, H, W]展平成[batch, C*H*W]
#[test]
fn test_forward_flatten() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[2, 1, 2, 2], Some("x"))?;
    let flat = graph.new_flatten_node(x, true, None)?;

    assert_eq!(graph.get_node_value_expected_shape(flat)?, vec![2, 4]);

    let data: Vec<f32> = (1..=8).map(|v| v as f32).collect();
    graph.set_node_value(x, Some(&Tensor::new(&data, &[2, 1, 2, 2])))?;
    graph.forward(flat)?;
    assert_eq!(
        graph.get_node_value(flat)?.unwrap(),
        &Tensor::new(&data, &[2, 4])
    );
    Ok(())
}
