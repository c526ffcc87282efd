/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Var的扩展算子，按用途分组为若干trait
 */

mod activation;
mod loss;
mod style;

pub use activation::VarActivationOps;
pub use loss::VarLossOps;
pub use style::VarStyleOps;
