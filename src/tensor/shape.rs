/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 张量的形状变换：reshape、转置、通道维拼接/切片
 */

use super::Tensor;
use ndarray::{Axis, IxDyn};

impl Tensor {
    /// 改变张量的形状（元素总数必须不变），返回新的张量。
    pub fn reshape(&self, shape: &[usize]) -> Tensor {
        assert_eq!(
            self.size(),
            shape.iter().product::<usize>(),
            "reshape前后元素总数必须一致：{:?} -> {:?}",
            self.shape(),
            shape
        );
        let data = self
            .data
            .as_standard_layout()
            .to_owned()
            .into_shape(IxDyn(shape))
            .unwrap();
        Tensor { data }
    }

    /// 二维矩阵转置。只接受2阶张量，否则会触发panic。
    pub fn transpose_2d(&self) -> Tensor {
        assert_eq!(self.dimension(), 2, "transpose_2d只接受2阶张量");
        Tensor {
            data: self.data.t().as_standard_layout().to_owned(),
        }
    }

    /// 沿通道维（第1维）拼接若干形状兼容的张量（NCHW布局）。
    /// 所有张量除通道维外的形状必须一致，否则会触发panic。
    pub fn concat_channels(tensors: &[&Tensor]) -> Tensor {
        assert!(!tensors.is_empty(), "拼接至少需要一个张量");
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = ndarray::concatenate(Axis(1), &views)
            .expect("通道维拼接要求除第1维外形状一致")
            .as_standard_layout()
            .to_owned();
        Tensor { data }
    }

    /// 取出通道维（第1维）上[start, end)区间的切片，返回新的张量。
    pub fn slice_channels(&self, start: usize, end: usize) -> Tensor {
        assert!(
            start < end && end <= self.shape()[1],
            "通道切片区间[{start}, {end})越界（通道数为{}）",
            self.shape()[1]
        );
        let view = self
            .data
            .slice_axis(Axis(1), ndarray::Slice::from(start..end));
        Tensor {
            data: view.to_owned(),
        }
    }
}
