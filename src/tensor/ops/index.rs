/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 按多维下标访问张量元素，如`t[[b, c, h, w]]`
 */

use crate::tensor::Tensor;
use ndarray::IxDyn;
use std::ops::{Index, IndexMut};

macro_rules! impl_fixed_index {
    ($n:literal) => {
        impl Index<[usize; $n]> for Tensor {
            type Output = f32;

            fn index(&self, index: [usize; $n]) -> &f32 {
                &self.data[IxDyn(&index)]
            }
        }

        impl IndexMut<[usize; $n]> for Tensor {
            fn index_mut(&mut self, index: [usize; $n]) -> &mut f32 {
                &mut self.data[IxDyn(&index)]
            }
        }
    };
}

impl_fixed_index!(1);
impl_fixed_index!(2);
impl_fixed_index!(3);
impl_fixed_index!(4);
impl_fixed_index!(5);
