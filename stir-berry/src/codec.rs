//! RAW 字节流与体数据网格之间的编解码.
//!
//! 所有 RAW 文件均无文件头: 内容恰为 `切片数 × 高 × 宽` 个样本,
//! 按切片优先、行其次、列最后的顺序排列; 形状只编码在文件名里
//! (见 [`crate::naming`]).

use ndarray::Array3;
use std::fs;
use std::io;
use std::path::Path;

use crate::{Idx3d, VolumeGrid};

/// RAW 数据读取/解码错误.
#[derive(Debug)]
pub enum RawReadError {
    /// 底层 I/O 错误 (文件缺失或不可读).
    Io(io::Error),

    /// 字节数不足以填满声明的形状.
    Undersized {
        /// 声明形状所需的字节数.
        expected: usize,

        /// 实际拿到的字节数.
        actual: usize,
    },
}

impl RawReadError {
    /// 该错误是否由文件缺失引起?
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// 检查 `bytes` 至少能填满 `shape` 形状的 `elem_size` 字节样本.
///
/// 超出的尾部字节被容忍并忽略 (历史数据只读取前缀).
#[inline]
fn check_len(bytes: &[u8], shape: Idx3d, elem_size: usize) -> Result<usize, RawReadError> {
    let (z, h, w) = shape;
    let n = z * h * w;
    let expected = n * elem_size;
    if bytes.len() < expected {
        return Err(RawReadError::Undersized {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(n)
}

/// 将字节流解码为 16 位大端样本网格 (扫描强度/超像素标签).
///
/// 每个样本为连续两个字节, 高字节在前: `值 = 256 * b0 + b1`.
pub fn decode_u16_be(bytes: &[u8], shape: Idx3d) -> Result<VolumeGrid<u16>, RawReadError> {
    let n = check_len(bytes, shape, 2)?;
    let mut buf = Vec::with_capacity(n);
    for i in 0..n {
        buf.push(256 * u16::from(bytes[2 * i]) + u16::from(bytes[2 * i + 1]));
    }
    // 长度已验证, 该操作不会生成 `Err`, 可直接 unwrap.
    Ok(VolumeGrid::from_array(
        Array3::from_shape_vec(shape, buf).unwrap(),
    ))
}

/// 将字节流解码为带符号单字节样本网格 (标注层).
///
/// 第 `(z, h, w)` 个样本位于字节偏移 `z*H*W + h*W + w` 处,
/// 即与顺序读取完全一致.
pub fn decode_mark(bytes: &[u8], shape: Idx3d) -> Result<VolumeGrid<i8>, RawReadError> {
    let n = check_len(bytes, shape, 1)?;
    let buf: Vec<i8> = bytes[..n].iter().map(|&b| b as i8).collect();
    Ok(VolumeGrid::from_array(
        Array3::from_shape_vec(shape, buf).unwrap(),
    ))
}

/// 将字节流解码为布尔旗标网格 (超像素边界).
///
/// 每个样本为连续两个字节的大端值, 非零即真.
pub fn decode_flag16(bytes: &[u8], shape: Idx3d) -> Result<VolumeGrid<bool>, RawReadError> {
    let n = check_len(bytes, shape, 2)?;
    let mut buf = Vec::with_capacity(n);
    for i in 0..n {
        buf.push(256 * u16::from(bytes[2 * i]) + u16::from(bytes[2 * i + 1]) > 0);
    }
    Ok(VolumeGrid::from_array(
        Array3::from_shape_vec(shape, buf).unwrap(),
    ))
}

/// 将标注层网格编码为字节流: 恰好 `切片数 × 高 × 宽` 个字节,
/// 无文件头、无长度前缀.
pub fn encode_mark(grid: &VolumeGrid<i8>) -> Vec<u8> {
    grid.data().iter().map(|&v| v as u8).collect()
}

/// 从 `path` 读取 16 位大端样本网格.
pub fn read_u16_grid<P: AsRef<Path>>(path: P, shape: Idx3d) -> Result<VolumeGrid<u16>, RawReadError> {
    let bytes = fs::read(path).map_err(RawReadError::Io)?;
    decode_u16_be(&bytes, shape)
}

/// 从 `path` 读取标注层网格.
pub fn read_mark_grid<P: AsRef<Path>>(path: P, shape: Idx3d) -> Result<VolumeGrid<i8>, RawReadError> {
    let bytes = fs::read(path).map_err(RawReadError::Io)?;
    decode_mark(&bytes, shape)
}

/// 从 `path` 读取布尔旗标网格.
pub fn read_flag_grid<P: AsRef<Path>>(
    path: P,
    shape: Idx3d,
) -> Result<VolumeGrid<bool>, RawReadError> {
    let bytes = fs::read(path).map_err(RawReadError::Io)?;
    decode_flag16(&bytes, shape)
}

/// 将标注层网格写入 `path`.
pub fn write_mark_grid<P: AsRef<Path>>(path: P, grid: &VolumeGrid<i8>) -> io::Result<()> {
    fs::write(path, encode_mark(grid))
}
