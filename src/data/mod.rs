/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 数据层：样本、数据集接口与DataLoader
 */

mod dataloader;
mod dataset;
mod error;

pub use dataloader::{Batch, DataLoader};
pub use dataset::{Dataset, Sample, TensorDataset};
pub use error::DataError;
