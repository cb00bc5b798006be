/*
 * @Author       : 老董
 * @Date         : 2026-08-15
 * @Description  : Conv2d / ChannelBiasAdd 节点测试（前向与梯度均为手算值）
 */

use crate::assert_err;
use crate::nn::graph::{GraphError, GraphInner};
use crate::tensor::Tensor;

#[test]
fn test_conv2d_creation_and_shape() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[4, 3, 28, 28], Some("input"))?;
    let kernel = graph.new_parameter_node(&[16, 3, 5, 5], Some("kernel"))?;

    // stride=1，对称填充2 → 输出尺寸不变
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (2, 2, 2, 2), Some("conv"))?;
    assert_eq!(
        graph.get_node_value_expected_shape(conv)?,
        vec![4, 16, 28, 28]
    );
    Ok(())
}

#[test]
fn test_conv2d_creation_invalid() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[1, 3, 8, 8], Some("input"))?;
    // 通道数不匹配
    let bad_kernel = graph.new_parameter_node(&[4, 2, 3, 3], Some("bad_kernel"))?;
    assert_err!(
        graph.new_conv2d_node(input, bad_kernel, (1, 1), (0, 0, 0, 0), None),
        GraphError::ShapeMismatch { .. }
    );

    // stride为0
    let kernel = graph.new_parameter_node(&[4, 3, 3, 3], Some("kernel"))?;
    assert_err!(
        graph.new_conv2d_node(input, kernel, (0, 1), (0, 0, 0, 0), None),
        GraphError::InvalidOperation { .. }
    );
    Ok(())
}

/// 3x3输入、2x2单位对角核、stride=1无填充：
/// out(i,j) = x(i,j) + x(i+1,j+1)
#[test]
fn test_conv2d_forward_hand_computed() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[1, 1, 3, 3], Some("input"))?;
    let kernel = graph.new_parameter_node(&[1, 1, 2, 2], Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;

    #[rustfmt::skip]
    let input_data = [
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
        7.0, 8.0, 9.0,
    ];
    graph.set_node_value(input, Some(&Tensor::new(&input_data, &[1, 1, 3, 3])))?;
    graph.set_node_value(kernel, Some(&Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[1, 1, 2, 2])))?;

    graph.forward(conv)?;
    #[rustfmt::skip]
    let expected = [
        6.0,  8.0,
        12.0, 14.0,
    ];
    assert_eq!(
        graph.get_node_value(conv)?.unwrap(),
        &Tensor::new(&expected, &[1, 1, 2, 2])
    );
    Ok(())
}

/// 非对称填充（下1右1）+ stride=2，对齐 "same" 卷积的输出尺寸
#[test]
fn test_conv2d_forward_asymmetric_padding() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[1, 1, 4, 4], Some("input"))?;
    let kernel = graph.new_parameter_node(&[1, 1, 3, 3], Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (2, 2), (0, 1, 0, 1), Some("conv"))?;

    assert_eq!(graph.get_node_value_expected_shape(conv)?, vec![1, 1, 2, 2]);

    graph.set_node_value(input, Some(&Tensor::ones(&[1, 1, 4, 4])))?;
    graph.set_node_value(kernel, Some(&Tensor::ones(&[1, 1, 3, 3])))?;
    graph.forward(conv)?;

    // 窗口覆盖的真实元素个数：左上9个、右上/左下6个、右下4个
    #[rustfmt::skip]
    let expected = [
        9.0, 6.0,
        6.0, 4.0,
    ];
    assert_eq!(
        graph.get_node_value(conv)?.unwrap(),
        &Tensor::new(&expected, &[1, 1, 2, 2])
    );
    Ok(())
}

/// conv + mse 的反向传播，对输入和卷积核的梯度都用手算值校验
#[test]
fn test_conv2d_backward_hand_computed() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[1, 1, 3, 3], Some("input"))?;
    let kernel = graph.new_parameter_node(&[1, 1, 2, 2], Some("kernel"))?;
    let conv = graph.new_conv2d_node(input, kernel, (1, 1), (0, 0, 0, 0), Some("conv"))?;
    let target = graph.new_target_input_node(&[1, 1, 2, 2], Some("target"))?;
    let loss = graph.new_mse_loss_node(conv, target, Some("loss"))?;

    #[rustfmt::skip]
    let input_data = [
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
        7.0, 8.0, 9.0,
    ];
    graph.watch_node(input)?;
    graph.set_node_value(input, Some(&Tensor::new(&input_data, &[1, 1, 3, 3])))?;
    graph.set_node_value(kernel, Some(&Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[1, 1, 2, 2])))?;
    graph.set_node_value(target, Some(&Tensor::zeros(&[1, 1, 2, 2])))?;

    graph.forward(loss)?;
    // pred = [6, 8, 12, 14]，loss = (36+64+144+196)/4 = 110
    let loss_value = graph.backward(loss)?;
    assert_eq!(loss_value, 110.0);

    // dpred = 2/4·pred = [3, 4, 6, 7]
    // 核为对角单位，散播回输入：
    #[rustfmt::skip]
    let expected_input_grad = [
        3.0, 4.0,  0.0,
        6.0, 10.0, 4.0,
        0.0, 6.0,  7.0,
    ];
    assert_eq!(
        graph.get_node_grad(input)?.unwrap(),
        Tensor::new(&expected_input_grad, &[1, 1, 3, 3])
    );

    // dkernel(di,dj) = Σ dpred(i,j)·x(i+di, j+dj)
    assert_eq!(
        graph.get_node_grad(kernel)?.unwrap(),
        Tensor::new(&[70.0, 90.0, 130.0, 150.0], &[1, 1, 2, 2])
    );
    Ok(())
}

/// ChannelBiasAdd：按通道加bias，反向时bias梯度是通道内求和
#[test]
fn test_channel_bias_add_forward_and_backward() -> Result<(), GraphError> {
    let mut graph = GraphInner::new();
    let input = graph.new_basic_input_node(&[1, 2, 2, 2], Some("input"))?;
    let bias = graph.new_parameter_node(&[1, 2], Some("bias"))?;
    let biased = graph.new_channel_bias_add_node(input, bias, Some("biased"))?;
    let target = graph.new_target_input_node(&[1, 2, 2, 2], Some("target"))?;
    let loss = graph.new_mse_loss_node(biased, target, Some("loss"))?;

    let input_data: Vec<f32> = (1..=8).map(|v| v as f32).collect();
    graph.watch_node(input)?;
    graph.set_node_value(input, Some(&Tensor::new(&input_data, &[1, 2, 2, 2])))?;
    graph.set_node_value(bias, Some(&Tensor::new(&[10.0, 20.0], &[1, 2])))?;
    graph.set_node_value(target, Some(&Tensor::zeros(&[1, 2, 2, 2])))?;

    graph.forward(biased)?;
    let expected = [11.0, 12.0, 13.0, 14.0, 25.0, 26.0, 27.0, 28.0];
    assert_eq!(
        graph.get_node_value(biased)?.unwrap(),
        &Tensor::new(&expected, &[1, 2, 2, 2])
    );

    graph.forward(loss)?;
    graph.backward(loss)?;

    // dpred = 2/8·pred = pred/4；输入的梯度与之相同
    let expected_input_grad: Vec<f32> = expected.iter().map(|v| v / 4.0).collect();
    assert_eq!(
        graph.get_node_grad(input)?.unwrap(),
        Tensor::new(&expected_input_grad, &[1, 2, 2, 2])
    );

    // dbias按通道求和：(11+12+13+14)/4 与 (25+26+27+28)/4
    assert_eq!(
        graph.get_node_grad(bias)?.unwrap(),
        Tensor::new(&[12.5, 26.5], &[1, 2])
    );
    Ok(())
}
