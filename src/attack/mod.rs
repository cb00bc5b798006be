/*
 * @Author       : 老董
 * @Date         : 2026-08-14
 * @Description  : FGSM（Fast Gradient Sign Method）对抗样本生成。
 *                 对输入图像求损失梯度，沿梯度符号方向加eps扰动：
 *                     adversary = image + sign(∂loss/∂image) * eps
 *                 结果不做裁剪，也不回写模型的任何状态。
 */

use crate::nn::{Graph, GraphError, Module, Var, VarLossOps};
use crate::tensor::Tensor;

/// 扰动强度的常用默认值（8位像素域里的2个灰度级）
pub const DEFAULT_EPS: f32 = 2.0 / 255.0;

/// 可被FGSM攻击的分类器
pub trait Classifier: Module {
    fn graph(&self) -> &Graph;
    /// 单张输入的形状[depth, height, width]（不含batch维）
    fn input_shape(&self) -> [usize; 3];
    fn num_classes(&self) -> usize;
    /// 在图上搭建从输入到softmax输出的前向链路
    fn forward(&self, input: &Var) -> Result<Var, GraphError>;
}

/// 生成单张图像的FGSM对抗样本。
///
/// `image`接受[depth, height, width]或[1, depth, height, width]，
/// `label`接受one-hot的[classes]或[1, classes]；
/// 返回与`image`同形状的对抗样本。模型参数与running统计量不会被修改
/// （内部走eval模式前向，结束后恢复原模式），本次调用搭建的一次性
/// 前向链也会在返回前从图中移除，反复调用不会让图变大。
pub fn generate_image_adversary<C: Classifier>(
    model: &C,
    image: &Tensor,
    label: &Tensor,
    eps: f32,
) -> Result<Tensor, GraphError> {
    let [depth, height, width] = model.input_shape();
    let batched_shape = [1, depth, height, width];

    let image_batched = match image.shape() {
        [d, h, w] if [*d, *h, *w] == [depth, height, width] => image.reshape(&batched_shape),
        [1, d, h, w] if [*d, *h, *w] == [depth, height, width] => image.clone(),
        got => {
            return Err(GraphError::ShapeMismatch {
                expected: batched_shape.to_vec(),
                got: got.to_vec(),
                message: "图像形状与模型输入不符".to_string(),
            });
        }
    };

    let classes = model.num_classes();
    let label_batched = match label.shape() {
        [c] if *c == classes => label.reshape(&[1, classes]),
        [1, c] if *c == classes => label.clone(),
        got => {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1, classes],
                got: got.to_vec(),
                message: "标签形状与模型类别数不符".to_string(),
            });
        }
    };

    let graph = model.graph();
    let was_eval = graph.is_eval();
    graph.eval();
    // 本次调用新建的输入/前向链/损失节点都在水位之上，取完梯度后整体丢弃
    let watermark = graph.node_id_watermark();

    // eval模式下前向（Dropout不生效、BatchNorm用running统计量），
    // 但梯度照常回传到被watch的输入
    let result = (|| {
        let x = graph.input(&batched_shape)?;
        x.set_requires_grad(true)?;
        let y = graph.target(&[1, classes])?;

        let pred = model.forward(&x)?;
        let loss = pred.mse_loss(&y)?;

        x.set_value(&image_batched)?;
        y.set_value(&label_batched)?;
        loss.backward()?;

        x.grad()?.ok_or_else(|| {
            GraphError::ComputationError("反向传播后输入节点没有梯度".to_string())
        })
    })();

    if !was_eval {
        graph.train();
    }
    graph.remove_nodes_since(watermark);
    let grad = result?;

    let adversary = &image_batched + &(&grad.sign() * eps);
    Ok(adversary.reshape(image.shape()))
}
