use crate::data::DataError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 训练入口配置（serde可反序列化，字段齐备默认值）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    /// 每个epoch结束时学习率乘以该系数
    pub lr_decay: f32,
    /// 数据加载并行度（保留的配置面；当前实现同步取数）
    pub num_workers: usize,
    /// 锁页内存开关（保留的配置面；对本实现无效果）
    pub pin_memory: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            epochs: 20,
            learning_rate: 1e-4,
            lr_decay: 0.9,
            num_workers: 4,
            pin_memory: false,
        }
    }
}

impl TrainConfig {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::FormatError(format!("配置解析失败：{e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_values() {
        let config = TrainConfig::default();
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.epochs, 20);
        assert_abs_diff_eq!(config.learning_rate, 1e-4);
        assert_abs_diff_eq!(config.lr_decay, 0.9);
        assert_eq!(config.num_workers, 4);
        assert!(!config.pin_memory);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = TrainConfig::from_json(r#"{"batch_size": 2, "epochs": 1}"#).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.epochs, 1);
        assert_abs_diff_eq!(config.learning_rate, 1e-4);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(TrainConfig::from_json("not json").is_err());
    }
}
