/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 参数的二进制序列化：按名称寻址，小端编码
 *
 * 文件格式：
 *   magic   : 4字节 "DSPR"
 *   version : u32
 *   count   : u32
 *   record× : name_len(u32) + name(utf8) + ndims(u32) + dims(u32×ndims) + data(f32×numel)
 */

use super::GraphInner;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"DSPR";
const VERSION: u32 = 1;

fn io_err(action: &str, e: std::io::Error) -> GraphError {
    GraphError::SerializationError(format!("{action}失败：{e}"))
}

impl GraphInner {
    /// 把图中所有Parameter节点的值写入文件（按名称排序，确保输出稳定）
    pub(in crate::nn) fn save_params(&self, path: &Path) -> Result<(), GraphError> {
        let mut records: Vec<(String, &Tensor)> = Vec::with_capacity(self.parameter_ids().len());
        for &id in self.parameter_ids() {
            let handle = self.get_node(id)?;
            let value = handle.value().ok_or_else(|| {
                GraphError::SerializationError(format!("{handle}没有值，无法保存"))
            })?;
            records.push((handle.name().to_string(), value));
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));

        let file = File::create(path).map_err(|e| io_err("创建参数文件", e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC).map_err(|e| io_err("写入魔数", e))?;
        writer
            .write_all(&VERSION.to_le_bytes())
            .map_err(|e| io_err("写入版本号", e))?;
        writer
            .write_all(&(records.len() as u32).to_le_bytes())
            .map_err(|e| io_err("写入参数个数", e))?;

        for (name, value) in records {
            let name_bytes = name.as_bytes();
            writer
                .write_all(&(name_bytes.len() as u32).to_le_bytes())
                .map_err(|e| io_err("写入名称长度", e))?;
            writer
                .write_all(name_bytes)
                .map_err(|e| io_err("写入名称", e))?;
            let shape = value.shape();
            writer
                .write_all(&(shape.len() as u32).to_le_bytes())
                .map_err(|e| io_err("写入维数", e))?;
            for &dim in shape {
                writer
                    .write_all(&(dim as u32).to_le_bytes())
                    .map_err(|e| io_err("写入维度", e))?;
            }
            for &x in value.data_as_slice() {
                writer
                    .write_all(&x.to_le_bytes())
                    .map_err(|e| io_err("写入数据", e))?;
            }
        }
        writer.flush().map_err(|e| io_err("刷新参数文件", e))
    }

    /// 从文件加载参数：按名称匹配图中的Parameter节点并覆盖其值。
    /// 文件中出现图里不存在的名称、或形状不符时报错。
    pub(in crate::nn) fn load_params(&mut self, path: &Path) -> Result<(), GraphError> {
        let file = File::open(path).map_err(|e| io_err("打开参数文件", e))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| io_err("读取魔数", e))?;
        if &magic != MAGIC {
            return Err(GraphError::SerializationError(
                "文件不是有效的参数文件（魔数不符）".to_string(),
            ));
        }
        let version = read_u32(&mut reader)?;
        if version != VERSION {
            return Err(GraphError::SerializationError(format!(
                "不支持的参数文件版本：{version}"
            )));
        }

        let count = read_u32(&mut reader)? as usize;
        for _ in 0..count {
            let name_len = read_u32(&mut reader)? as usize;
            let mut name_bytes = vec![0u8; name_len];
            reader
                .read_exact(&mut name_bytes)
                .map_err(|e| io_err("读取名称", e))?;
            let name = String::from_utf8(name_bytes).map_err(|e| {
                GraphError::SerializationError(format!("参数名称不是有效的UTF-8：{e}"))
            })?;

            let ndims = read_u32(&mut reader)? as usize;
            let mut shape = Vec::with_capacity(ndims);
            for _ in 0..ndims {
                shape.push(read_u32(&mut reader)? as usize);
            }
            let numel: usize = shape.iter().product();
            let mut data = vec![0.0f32; numel];
            for x in &mut data {
                let mut buf = [0u8; 4];
                reader
                    .read_exact(&mut buf)
                    .map_err(|e| io_err("读取数据", e))?;
                *x = f32::from_le_bytes(buf);
            }

            let id = self.node_id_by_name(&name).ok_or_else(|| {
                GraphError::SerializationError(format!("图中不存在名为[{name}]的参数节点"))
            })?;
            if !self.get_node(id)?.is_parameter() {
                return Err(GraphError::SerializationError(format!(
                    "节点[{name}]不是Parameter节点，无法加载参数"
                )));
            }
            self.set_node_value(id, &Tensor::new(&data, &shape))?;
        }
        Ok(())
    }
}

fn read_u32(reader: &mut impl Read) -> Result<u32, GraphError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| io_err("读取u32", e))?;
    Ok(u32::from_le_bytes(buf))
}
