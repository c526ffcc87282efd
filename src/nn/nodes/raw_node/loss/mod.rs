pub(crate) mod bce_loss;
pub(crate) mod l1_loss;
pub(crate) mod mse_loss;

pub(in crate::nn) use bce_loss::BceLoss;
pub(in crate::nn) use l1_loss::L1Loss;
pub(in crate::nn) use mse_loss::{MseLoss, Reduction};
