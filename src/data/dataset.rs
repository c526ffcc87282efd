use super::DataError;
use crate::tensor::Tensor;

/// 一个训练样本（不含batch维）：
/// - `x`: 含网点的输入图像 [3, H, W]
/// - `y_descreen`: 去网点的目标图像 [3, H, W]
/// - `y_edge`: 目标边缘图 [1, H, W]，取值[0, 1]
#[derive(Clone)]
pub struct Sample {
    pub x: Tensor,
    pub y_descreen: Tensor,
    pub y_edge: Tensor,
}

impl Sample {
    pub fn new(x: Tensor, y_descreen: Tensor, y_edge: Tensor) -> Result<Self, DataError> {
        for (name, t, channels) in [("x", &x, 3), ("y_descreen", &y_descreen, 3), ("y_edge", &y_edge, 1)]
        {
            if t.dimension() != 3 || t.shape()[0] != channels {
                return Err(DataError::ShapeMismatch(format!(
                    "样本的{name}必须是[{channels}, H, W]，得到{:?}",
                    t.shape()
                )));
            }
        }
        let (h, w) = (x.shape()[1], x.shape()[2]);
        if y_descreen.shape()[1..] != [h, w] || y_edge.shape()[1..] != [h, w] {
            return Err(DataError::ShapeMismatch(format!(
                "样本的三个张量空间尺寸必须一致：x {:?}、y_descreen {:?}、y_edge {:?}",
                x.shape(),
                y_descreen.shape(),
                y_edge.shape()
            )));
        }
        Ok(Self {
            x,
            y_descreen,
            y_edge,
        })
    }
}

/// 数据集接口：可索引，产出三元组样本
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Sample, DataError>;
}

/// 全部驻留内存的数据集（测试与小规模训练用）
pub struct TensorDataset {
    samples: Vec<Sample>,
}

impl TensorDataset {
    /// 所有样本的空间尺寸必须一致
    pub fn new(samples: Vec<Sample>) -> Result<Self, DataError> {
        if let Some(first) = samples.first() {
            let shape = first.x.shape().to_vec();
            for (i, sample) in samples.iter().enumerate() {
                if sample.x.shape() != shape {
                    return Err(DataError::ShapeMismatch(format!(
                        "样本{i}的形状{:?}与首个样本{shape:?}不一致",
                        sample.x.shape()
                    )));
                }
            }
        }
        Ok(Self { samples })
    }
}

impl Dataset for TensorDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<Sample, DataError> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(DataError::IndexOutOfBounds {
                index,
                len: self.samples.len(),
            })
    }
}
