use std::path::PathBuf;
use thiserror::Error;

/// 数据/检查点I/O错误
#[derive(Debug, Error)]
pub enum DataError {
    #[error("文件不存在：{0}")]
    FileNotFound(PathBuf),

    #[error("IO错误：{0}")]
    Io(#[from] std::io::Error),

    #[error("格式错误：{0}")]
    FormatError(String),

    #[error("索引越界：索引{index}，数据集大小{len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("形状不匹配：{0}")]
    ShapeMismatch(String),
}
