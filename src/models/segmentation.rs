use super::{LEAKY_SLOPE, validate_input_channels};
use crate::data::DataError;
use crate::nn::{Conv2d, Forward, Graph, GraphError, Module, Var, VarActivationOps, VarStyleOps};
use crate::tensor::Tensor;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// 分割模块（冻结协作者）
///
/// `encode`：两级stride-2卷积把图像降到1/4分辨率的特征；
/// `decode`：1x1分辨率不变的卷积出25类得分，逐像素softmax后最近邻上采样回输入尺寸。
///
/// 权重全部是Input常量节点：反向传播不为它们计算梯度，优化器也看不到它们，
/// 梯度只"穿过"本模块流向上游（粗糙重建）。
pub struct SegmentationModule {
    enc1: Conv2d,
    enc2: Conv2d,
    dec: Conv2d,
}

pub const SEG_NUM_CLASSES: usize = 25;
const DOWNSCALE: usize = 4;

/// 权重文件中的三条记录名
const WEIGHT_NAMES: [&str; 3] = ["seg_enc1_kernel", "seg_enc2_kernel", "seg_dec_kernel"];

impl SegmentationModule {
    pub const IN_CHANNELS: usize = 3;

    /// 用种子确定性生成权重（测试与无预训练权重场景）
    pub fn new_random(graph: &Graph, base_channels: usize, seed: u64) -> Result<Self, GraphError> {
        let c = base_channels;
        Ok(Self {
            enc1: Conv2d::new_frozen(graph, "seg_enc1", 3, c, (3, 3), (2, 2), (1, 1), seed)?,
            enc2: Conv2d::new_frozen(graph, "seg_enc2", c, 2 * c, (3, 3), (2, 2), (1, 1), seed + 1)?,
            dec: Conv2d::new_frozen(
                graph,
                "seg_dec",
                2 * c,
                SEG_NUM_CLASSES,
                (1, 1),
                (1, 1),
                (0, 0),
                seed + 2,
            )?,
        })
    }

    /// 从预训练权重文件构建。文件缺失或记录不全在会话构建期就是致命错误。
    pub fn from_file(graph: &Graph, path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.to_path_buf()));
        }
        let mut weights = read_weight_records(path)?;
        let mut take = |name: &str| {
            weights
                .remove(name)
                .ok_or_else(|| DataError::FormatError(format!("权重文件缺少记录[{name}]")))
        };

        let enc1_kernel = take(WEIGHT_NAMES[0])?;
        let enc2_kernel = take(WEIGHT_NAMES[1])?;
        let dec_kernel = take(WEIGHT_NAMES[2])?;

        let build = |name: &str, kernel: &Tensor, stride, padding| {
            Conv2d::new_frozen_with_weights(graph, name, kernel, stride, padding)
                .map_err(|e| DataError::FormatError(format!("构建分割模块失败：{e}")))
        };
        Ok(Self {
            enc1: build("seg_enc1", &enc1_kernel, (2, 2), (1, 1))?,
            enc2: build("seg_enc2", &enc2_kernel, (2, 2), (1, 1))?,
            dec: build("seg_dec", &dec_kernel, (1, 1), (0, 0))?,
        })
    }

    /// 图像 → 1/4分辨率特征
    pub fn encode(&self, x: &Var) -> Result<Var, GraphError> {
        validate_input_channels(x, Self::IN_CHANNELS, "SegmentationModule")?;
        let h1 = self.enc1.forward(x)?.leaky_relu(LEAKY_SLOPE)?;
        self.enc2.forward(&h1)?.leaky_relu(LEAKY_SLOPE)
    }

    /// 特征 → 输入尺寸的逐像素25类概率图
    pub fn decode(&self, features: &Var) -> Result<Var, GraphError> {
        let scores = self.dec.forward(features)?;
        scores.channel_softmax()?.upsample_nearest(DOWNSCALE)
    }

    /// 冻结权重的常量节点（测试验证"训练前后逐位一致"用）
    pub fn frozen_weights(&self) -> Vec<Var> {
        // 冻结层的parameters()为空，这里直接收集常量核
        [&self.enc1, &self.enc2, &self.dec]
            .iter()
            .map(|layer| layer.kernel().clone())
            .collect()
    }
}

impl Forward for SegmentationModule {
    /// encode后decode：图像 → 输入尺寸的25类概率图
    fn forward(&self, x: &Var) -> Result<Var, GraphError> {
        let features = self.encode(x)?;
        self.decode(&features)
    }
}

impl Module for SegmentationModule {
    fn parameters(&self) -> Vec<Var> {
        Vec::new()
    }
}

/// 读取权重文件的所有记录（与参数检查点同格式：DSPR魔数 + 版本 + 记录）
fn read_weight_records(path: &Path) -> Result<HashMap<String, Tensor>, DataError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != b"DSPR" {
        return Err(DataError::FormatError("权重文件魔数不符".to_string()));
    }
    let version = read_u32(&mut reader)?;
    if version != 1 {
        return Err(DataError::FormatError(format!(
            "不支持的权重文件版本：{version}"
        )));
    }

    let count = read_u32(&mut reader)? as usize;
    let mut records = HashMap::with_capacity(count);
    for _ in 0..count {
        let name_len = read_u32(&mut reader)? as usize;
        let mut name_bytes = vec![0u8; name_len];
        reader.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|e| DataError::FormatError(format!("记录名不是有效的UTF-8：{e}")))?;

        let ndims = read_u32(&mut reader)? as usize;
        let mut shape = Vec::with_capacity(ndims);
        for _ in 0..ndims {
            shape.push(read_u32(&mut reader)? as usize);
        }
        let numel: usize = shape.iter().product();
        let mut data = vec![0.0f32; numel];
        for x in &mut data {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            *x = f32::from_le_bytes(buf);
        }
        records.insert(name, Tensor::new(&data, &shape));
    }
    Ok(records)
}

fn read_u32(reader: &mut impl Read) -> Result<u32, DataError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
