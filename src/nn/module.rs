/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Module/Forward trait：网络的公共接口（参数收集与单输入前向）
 */

use crate::nn::graph::GraphError;
use crate::nn::var::Var;

/// 网络模块：能报出自己全部可训练参数。
/// 冻结模块（权重为Input常量）返回空集合。
pub trait Module {
    fn parameters(&self) -> Vec<Var>;
}

/// 单输入前向：生成器、判别器与冻结协作模块的统一前向签名。
/// 各网络仍是互不替换的具体类型，本trait不抹平它们的差别。
pub trait Forward {
    fn forward(&self, input: &Var) -> Result<Var, GraphError>;
}
