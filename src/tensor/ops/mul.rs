/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 张量的乘法：逐元素相乘（Hadamard积），或张量与纯数相乘。
 */

use crate::tensor::Tensor;
use std::ops::Mul;

impl Mul<f32> for Tensor {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            data: &self.data * scalar,
        }
    }
}
impl Mul<f32> for &Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data * scalar,
        }
    }
}
impl Mul<Tensor> for f32 {
    type Output = Tensor;

    fn mul(self, tensor: Tensor) -> Tensor {
        &tensor * self
    }
}

impl Mul for Tensor {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        &self * &other
    }
}
impl Mul<&Tensor> for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        assert!(
            self.is_same_shape(other),
            "形状不一致，无法逐元素相乘：{:?} * {:?}",
            self.shape(),
            other.shape()
        );
        Tensor {
            data: &self.data * &other.data,
        }
    }
}
