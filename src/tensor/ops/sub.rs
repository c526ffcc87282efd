/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 张量的减法，实现了两个张量“逐元素”（或张量与纯数）相减的运算，并返回一个新的张量。
 */

use crate::tensor::Tensor;
use std::ops::{Neg, Sub};

impl Sub<f32> for &Tensor {
    type Output = Tensor;

    fn sub(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data - scalar,
        }
    }
}

impl Sub for Tensor {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        &self - &other
    }
}
impl Sub<&Tensor> for Tensor {
    type Output = Self;

    fn sub(self, other: &Tensor) -> Self {
        &self - other
    }
}
impl Sub<&Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, other: &Tensor) -> Tensor {
        assert!(
            self.is_same_shape(other),
            "形状不一致，无法相减：{:?} - {:?}",
            self.shape(),
            other.shape()
        );
        Tensor {
            data: &self.data - &other.data,
        }
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        Tensor {
            data: self.data.mapv(|x| -x),
        }
    }
}
