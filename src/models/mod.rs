/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 去网点训练管线的各网络：生成器、判别器与冻结协作模块
 */

mod coarse_net;
mod details_net;
mod discriminators;
mod edge_net;
mod feature_net;
mod segmentation;

pub use coarse_net::CoarseNet;
pub use details_net::DetailsNet;
pub use discriminators::{DiscriminatorOne, DiscriminatorTwo};
pub use edge_net::EdgeNet;
pub use feature_net::FeatureNet;
pub use segmentation::SegmentationModule;

use crate::nn::{GraphError, Var};

/// 激活斜率（全管线统一）
pub(crate) const LEAKY_SLOPE: f32 = 0.2;

/// 入口通道校验：在创建任何卷积节点之前快速失败
pub(crate) fn validate_input_channels(
    x: &Var,
    expected: usize,
    network: &str,
) -> Result<(), GraphError> {
    let shape = x.shape()?;
    if shape.len() != 4 || shape[1] != expected {
        return Err(GraphError::ShapeMismatch {
            expected: vec![expected],
            got: shape.get(1).copied().map(|c| vec![c]).unwrap_or_default(),
            message: format!("{network}期望{expected}通道的4D输入，得到{shape:?}"),
        });
    }
    Ok(())
}
