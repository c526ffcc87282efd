use crate::tensor::Tensor;
use std::cmp::PartialEq;

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Tensor {
    /// 对张量中的所有元素求和并返回纯数。
    pub fn sum_all(&self) -> f32 {
        self.data.iter().sum()
    }

    /// 对张量中的所有元素求平均并返回纯数。
    pub fn mean_all(&self) -> f32 {
        self.sum_all() / self.size() as f32
    }

    /// 对每个元素应用给定的函数，返回新的张量。
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor {
            data: self.data.mapv(f),
        }
    }

    /// 逐元素取绝对值。
    pub fn abs(&self) -> Tensor {
        self.map(f32::abs)
    }

    /// 逐元素取符号（-1、0、1）。
    pub fn signum(&self) -> Tensor {
        self.map(|x| if x == 0.0 { 0.0 } else { x.signum() })
    }
}
