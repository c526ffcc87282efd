/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Graph 模块的错误类型
 */

use crate::nn::NodeId;
use thiserror::Error;

/// Graph 操作错误类型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("找不到节点：{0}")]
    NodeNotFound(NodeId),

    #[error("无效操作：{0}")]
    InvalidOperation(String),

    #[error("形状不匹配：期望{expected:?}，得到{got:?}。{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    #[error("维度不匹配：期望{expected}维，得到{got}维。{message}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },

    #[error("计算错误：{0}")]
    ComputationError(String),

    #[error("节点名称重复：{0}")]
    DuplicateNodeName(String),

    #[error("序列化错误：{0}")]
    SerializationError(String),
}
