mod mse_loss;

pub(in crate::nn) use mse_loss::MseLoss;
pub use mse_loss::Reduction;
