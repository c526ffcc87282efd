/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 复合损失：粗糙损失、边缘损失、细节损失
 */

mod coarse_loss;
mod details_loss;
mod edge_loss;

pub use coarse_loss::CoarseLoss;
pub use details_loss::DetailsLoss;
pub use edge_loss::EdgeLoss;
