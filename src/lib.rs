/*
 * @Author       : 老董
 * @Date         : 2026-08-10
 * @Description  : adv_torch —— 基于静态计算图自动微分的 FGSM 对抗样本演示框架
 *
 * 两个面向用户的入口：
 * - `model::build_classifier`：搭建演示用的 CNN 分类器（SimpleCnn）
 * - `attack::generate_image_adversary`：FGSM 对抗样本生成
 *
 * 其余模块是支撑它们的微型框架：
 * - `tensor`：基于 ndarray 的 f32 张量
 * - `nn`：计算图、节点、Var 句柄、层
 */

pub mod attack;
pub mod errors;
pub mod model;
pub mod nn;
pub mod tensor;
pub mod utils;

pub use attack::{generate_image_adversary, Classifier, DEFAULT_EPS};
pub use model::{build_classifier, build_classifier_seeded, SimpleCnn};
