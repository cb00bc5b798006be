/*
 * @Author       : 老董
 * @Date         : 2026-08-16
 * @Description  : FGSM 对抗样本生成的集成测试
 */

use adv_torch::nn::Module;
use adv_torch::tensor::Tensor;
use adv_torch::{DEFAULT_EPS, build_classifier_seeded, generate_image_adversary};
use approx::assert_abs_diff_eq;

fn one_hot(classes: usize, index: usize) -> Tensor {
    let mut data = vec![0.0f32; classes];
    data[index] = 1.0;
    Tensor::new(&data, &[classes])
}

#[test]
fn test_adversary_preserves_shape() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let label = one_hot(3, 0);

    // 3维图像 → 3维对抗样本
    let image_3d = Tensor::filled(0.5, &[1, 8, 8]);
    let adversary = generate_image_adversary(&model, &image_3d, &label, DEFAULT_EPS).unwrap();
    assert_eq!(adversary.shape(), &[1, 8, 8]);

    // 带batch维的4维图像 → 4维对抗样本
    let image_4d = Tensor::filled(0.5, &[1, 1, 8, 8]);
    let adversary = generate_image_adversary(&model, &image_4d, &label, DEFAULT_EPS).unwrap();
    assert_eq!(adversary.shape(), &[1, 1, 8, 8]);
}

/// 每个像素的扰动只会是 -eps、0 或 +eps
#[test]
fn test_adversary_perturbation_is_sign_times_eps() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let image = Tensor::filled(0.5, &[1, 8, 8]);
    let label = one_hot(3, 1);
    let eps = DEFAULT_EPS;

    let adversary = generate_image_adversary(&model, &image, &label, eps).unwrap();

    let mut nonzero = 0usize;
    for (adv, orig) in adversary
        .data_as_slice()
        .iter()
        .zip(image.data_as_slice())
    {
        let delta = adv - orig;
        assert!(
            delta == 0.0 || (delta - eps).abs() < 1e-7 || (delta + eps).abs() < 1e-7,
            "扰动{delta}不在{{-eps, 0, +eps}}内"
        );
        if delta != 0.0 {
            nonzero += 1;
        }
    }
    // 非零输入下梯度应传到大部分像素
    assert!(nonzero > 0, "对抗样本与原图完全相同");
}

/// 同一模型、同一输入反复生成，结果逐位相同（eval前向 + 无随机性）
#[test]
fn test_adversary_is_deterministic() {
    let model = build_classifier_seeded(8, 8, 1, 3, 7).unwrap();
    let image = Tensor::filled(0.3, &[1, 8, 8]);
    let label = one_hot(3, 2);

    let first = generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    let second = generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    assert_eq!(first, second);
}

/// 纯函数性：攻击不修改模型参数，也不改变图的模式
#[test]
fn test_adversary_does_not_mutate_model() {
    use adv_torch::Classifier;

    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let params_before: Vec<Tensor> = model
        .parameters()
        .iter()
        .map(|p| p.value().unwrap())
        .collect();
    assert!(!model.graph().is_eval());

    let image = Tensor::filled(0.5, &[1, 8, 8]);
    let label = one_hot(3, 0);
    generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();

    // 模式被恢复为train
    assert!(!model.graph().is_eval());
    for (before, param) in params_before.iter().zip(model.parameters()) {
        assert_eq!(before, &param.value().unwrap());
    }
}

/// 每次调用搭的一次性前向链会被整体移除，图的节点数不随调用次数增长
#[test]
fn test_attack_does_not_grow_graph() {
    use adv_torch::Classifier;

    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let image = Tensor::filled(0.5, &[1, 8, 8]);
    let label = one_hot(3, 0);

    let nodes_before = model.graph().nodes_count();
    generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    assert_eq!(model.graph().nodes_count(), nodes_before);
    generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    assert_eq!(model.graph().nodes_count(), nodes_before);
}

/// 全零图像：第一层ReLU全程关断，梯度传不到输入，对抗样本等于原图
#[test]
fn test_adversary_of_zero_image_is_unchanged() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let image = Tensor::zeros(&[1, 8, 8]);
    let label = one_hot(3, 0);

    let adversary = generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    assert_eq!(adversary, image);
}

/// 结果不做[0,1]裁剪：接近1的像素可以越过1
#[test]
fn test_adversary_is_not_clipped() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let image = Tensor::filled(1.0, &[1, 8, 8]);
    let label = one_hot(3, 1);

    let adversary = generate_image_adversary(&model, &image, &label, DEFAULT_EPS).unwrap();
    let max = adversary
        .data_as_slice()
        .iter()
        .fold(f32::MIN, |m, &v| m.max(v));
    assert!(max > 1.0, "正向扰动的像素应越过1，实际最大值{max}");
}

#[test]
fn test_label_accepts_both_shapes() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();
    let image = Tensor::filled(0.5, &[1, 8, 8]);

    let flat = generate_image_adversary(&model, &image, &one_hot(3, 0), DEFAULT_EPS).unwrap();
    let row_label = one_hot(3, 0).reshape(&[1, 3]);
    let row = generate_image_adversary(&model, &image, &row_label, DEFAULT_EPS).unwrap();
    assert_eq!(flat, row);
}

#[test]
fn test_invalid_shapes_are_rejected() {
    let model = build_classifier_seeded(8, 8, 1, 3, 42).unwrap();

    // 图像尺寸不符
    let bad_image = Tensor::filled(0.5, &[1, 7, 7]);
    assert!(generate_image_adversary(&model, &bad_image, &one_hot(3, 0), DEFAULT_EPS).is_err());

    // 标签类别数不符
    let image = Tensor::filled(0.5, &[1, 8, 8]);
    assert!(generate_image_adversary(&model, &image, &one_hot(4, 0), DEFAULT_EPS).is_err());
}

#[test]
fn test_default_eps_value() {
    assert_abs_diff_eq!(DEFAULT_EPS, 2.0 / 255.0);
}
