/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 神经网络模块：计算图、变量句柄、层、优化器
 */

pub mod graph;
pub mod layer;
pub mod module;
pub mod nodes;
pub mod optimizer;
pub mod var;
pub mod var_ops;

pub use graph::{Graph, GraphError};
pub use layer::Conv2d;
pub use module::{Forward, Module};
pub use nodes::NodeId;
pub use optimizer::{Adam, Optimizer, StepLR};
pub use var::{Init, Var};
pub use var_ops::{VarActivationOps, VarLossOps, VarStyleOps};
