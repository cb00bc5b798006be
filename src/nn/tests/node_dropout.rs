/*
 * @Author       : 老董
 * @Date         : 2026-08-15
 * @Description  : Dropout 节点测试（inverted dropout、模式切换、种子可重复）
 */

use crate::assert_err;
use crate::nn::graph::{GraphError, GraphInner};
use crate::tensor::Tensor;

#[test]
fn test_dropout_creation_invalid_rate() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[2, 2], Some("x"))?;
    assert_err!(
        graph.new_dropout_node(x, 1.0, None),
        GraphError::InvalidOperation { .. }
    );
    assert_err!(
        graph.new_dropout_node(x, -0.1, None),
        GraphError::InvalidOperation { .. }
    );
    Ok(())
}

/// 训练模式：保留的元素被放大1/(1-rate)，其余置0
#[test]
fn test_dropout_forward_training() -> Result<(), GraphError> {
    let mut graph = GraphInner::new_with_seed(42);
    let x = graph.new_basic_input_node(&[8, 8], Some("x"))?;
    let dropout = graph.new_dropout_node(x, 0.5, Some("dropout"))?;

    graph.set_node_value(x, Some(&Tensor::ones(&[8, 8])))?;
    graph.forward(dropout)?;

    let value = graph.get_node_value(dropout)?.unwrap();
    let mut zeros = 0usize;
    for v in value.data_as_slice() {
        assert!(*v == 0.0 || *v == 2.0, "元素应为0或1/(1-0.5)=2，得到{v}");
        if *v == 0.0 {
            zeros += 1;
        }
    }
    // rate=0.5时置零的比例应该在合理范围内（64个元素）
    assert!(zeros > 10 && zeros < 54, "置零个数{zeros}偏离预期");
    Ok(())
}

#[test]
fn test_dropout_forward_eval_is_identity() -> Result<(), GraphError> {
    let mut graph = GraphInner::new_with_seed(42);
    let x = graph.new_basic_input_node(&[4, 4], Some("x"))?;
    let dropout = graph.new_dropout_node(x, 0.5, Some("dropout"))?;

    let input = Tensor::new(&(1..=16).map(|v| v as f32).collect::<Vec<_>>(), &[4, 4]);
    graph.set_node_value(x, Some(&input))?;

    graph.set_eval_mode();
    graph.forward(dropout)?;
    assert_eq!(graph.get_node_value(dropout)?.unwrap(), &input);
    Ok(())
}

#[test]
fn test_dropout_rate_zero_is_identity() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let x = graph.new_basic_input_node(&[2, 2], Some("x"))?;
    let dropout = graph.new_dropout_node(x, 0.0, Some("dropout"))?;

    let input = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    graph.set_node_value(x, Some(&input))?;
    graph.forward(dropout)?;
    assert_eq!(graph.get_node_value(dropout)?.unwrap(), &input);
    Ok(())
}

/// 相同种子的两张图生成完全相同的掩码
#[test]
fn test_dropout_seeded_is_deterministic() -> Result<(), GraphError> {
    let run = || -> Result<Tensor, GraphError> {
        let mut graph = GraphInner::new_with_seed(7);
        let x = graph.new_basic_input_node(&[8, 8], Some("x"))?;
        let dropout = graph.new_dropout_node(x, 0.5, Some("dropout"))?;
        graph.set_node_value(x, Some(&Tensor::ones(&[8, 8])))?;
        graph.forward(dropout)?;
        Ok(graph.get_node_value(dropout)?.unwrap().clone())
    };

    assert_eq!(run()?, run()?);
    Ok(())
}

/// 反向传播沿用前向的掩码：被置零的位置梯度为0
#[test]
fn test_dropout_backward_uses_mask() -> Result<(), GraphError> {
    let mut graph = GraphInner::new_with_seed(3);
    let x = graph.new_basic_input_node(&[4, 4], Some("x"))?;
    let dropout = graph.new_dropout_node(x, 0.5, Some("dropout"))?;
    let target = graph.new_target_input_node(&[4, 4], Some("target"))?;
    let loss = graph.new_mse_loss_node(dropout, target, Some("loss"))?;

    graph.watch_node(x)?;
    graph.set_node_value(x, Some(&Tensor::ones(&[4, 4])))?;
    graph.set_node_value(target, Some(&Tensor::zeros(&[4, 4])))?;

    graph.forward(loss)?;
    // backward会释放中间值，先存一份dropout的输出
    let output = graph.get_node_value(dropout)?.unwrap().clone();
    graph.backward(loss)?;

    // y = m⊙x（m∈{0,2}），dy = 2y/16，dx = m⊙dy：
    // 保留位置 dx = 2·2·2/16 = 0.5，置零位置 dx = 0
    let x_grad = graph.get_node_grad(x)?.unwrap();
    for (g, y) in x_grad.data_as_slice().iter().zip(output.data_as_slice()) {
        if *y == 0.0 {
            assert_eq!(*g, 0.0);
        } else {
            assert_eq!(*g, 0.5);
        }
    }
    Ok(())
}
