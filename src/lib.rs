/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : descreen：多网络半色调图像复原（descreening）训练管线。
 *                 基于计算图的反向模式自动微分引擎，承载粗重建网络、边缘网络、
 *                 细节生成网络与双判别器的联合GAN训练编排。
 */

pub mod data;
pub mod losses;
pub mod models;
pub mod nn;
pub mod tensor;
pub mod train;

pub use tensor::Tensor;
