use super::{DataError, Dataset};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// 一个训练批次（NCHW）
pub struct Batch {
    pub x: Tensor,
    pub y_descreen: Tensor,
    pub y_edge: Tensor,
}

/// 把数据集组装成批次：可选打乱（种子可复现）与丢弃不完整的末批
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    rng: StdRng,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    pub fn new(
        dataset: &'a D,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        seed: u64,
    ) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::FormatError("batch_size必须大于0".to_string()));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle,
            drop_last,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// 产出一个epoch的所有批次。每次调用重新（按rng的当前状态）打乱。
    pub fn epoch(&mut self) -> Result<Vec<Batch>, DataError> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut self.rng);
        }

        let mut batches = Vec::new();
        for chunk in indices.chunks(self.batch_size) {
            if chunk.len() < self.batch_size && self.drop_last {
                continue;
            }
            batches.push(self.assemble(chunk)?);
        }
        Ok(batches)
    }

    /// 把若干[C, H, W]样本堆叠成[B, C, H, W]批次
    fn assemble(&self, indices: &[usize]) -> Result<Batch, DataError> {
        let mut x_data = Vec::new();
        let mut y_descreen_data = Vec::new();
        let mut y_edge_data = Vec::new();
        let mut sample_shapes = None;

        for &index in indices {
            let sample = self.dataset.get(index)?;
            x_data.extend_from_slice(sample.x.data_as_slice());
            y_descreen_data.extend_from_slice(sample.y_descreen.data_as_slice());
            y_edge_data.extend_from_slice(sample.y_edge.data_as_slice());
            sample_shapes.get_or_insert((
                sample.x.shape().to_vec(),
                sample.y_descreen.shape().to_vec(),
                sample.y_edge.shape().to_vec(),
            ));
        }

        let (x_shape, y_descreen_shape, y_edge_shape) = sample_shapes
            .ok_or_else(|| DataError::FormatError("空批次".to_string()))?;
        let batched = |shape: &[usize]| {
            let mut s = vec![indices.len()];
            s.extend_from_slice(shape);
            s
        };
        Ok(Batch {
            x: Tensor::new(&x_data, &batched(&x_shape)),
            y_descreen: Tensor::new(&y_descreen_data, &batched(&y_descreen_shape)),
            y_edge: Tensor::new(&y_edge_data, &batched(&y_edge_shape)),
        })
    }
}
