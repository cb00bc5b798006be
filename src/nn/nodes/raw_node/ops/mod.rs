mod add;
mod batch_norm;
mod channel_bias_add;
mod conv2d;
mod dropout;
mod flatten;
mod leaky_relu;
mod mat_mul;
mod softmax;

pub(in crate::nn) use add::Add;
pub(in crate::nn) use batch_norm::{BatchNorm, RunningStats};
pub(in crate::nn) use channel_bias_add::ChannelBiasAdd;
pub(in crate::nn) use conv2d::Conv2d;
pub(in crate::nn) use dropout::Dropout;
pub(in crate::nn) use flatten::Flatten;
pub(in crate::nn) use leaky_relu::LeakyReLU;
pub(in crate::nn) use mat_mul::MatMul;
pub(in crate::nn) use softmax::Softmax;
