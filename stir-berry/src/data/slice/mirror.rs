//! 标注切片镜像. 用于提取和复原标注层的水平切片.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::Array2;
use std::io::{Read, Write};

use super::{GridSlice, GridSliceMut, OwnedGridSlice};
use crate::Idx2d;

/// 一个拥有所有权的标注层水平切片的不透明镜像.
/// 用于临时保存一个标注切片的值, 并在随后恢复.
///
/// 注意该结构是被设计来 **快速** 回填原数据的,
/// 因此并不压缩原数据. 长期持有请换用 [`CompactMarkSlice`].
#[derive(Clone, Debug)]
pub struct MarkMirror(pub(crate) Vec<i8>);

impl From<&GridSlice<'_, i8>> for MarkMirror {
    fn from(value: &GridSlice<'_, i8>) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl From<&GridSliceMut<'_, i8>> for MarkMirror {
    fn from(value: &GridSliceMut<'_, i8>) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl MarkMirror {
    /// 镜像包含的像素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 镜像是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl GridSliceMut<'_, i8> {
    /// 获取拥有所有权的镜像, 供以后可能的恢复.
    #[inline]
    pub fn mirror(&self) -> MarkMirror {
        self.into()
    }

    /// 用 `mirror` 覆写原本 `self` 的内容.
    ///
    /// 如果 `mirror` 大小与 `self.size()` 不符, 则程序 panic.
    pub fn resume(&mut self, mirror: &MarkMirror) {
        assert_eq!(self.size(), mirror.0.len(), "镜像大小不符");
        for (r, w) in mirror.0.iter().zip(self.iter_mut()) {
            *w = *r;
        }
    }
}

impl GridSlice<'_, i8> {
    /// 获取拥有所有权的镜像, 供以后可能的恢复.
    #[inline]
    pub fn mirror(&self) -> MarkMirror {
        self.into()
    }

    /// 压缩数据.
    pub fn compress(&self) -> CompactMarkSlice {
        let buf = self.as_row_major_slice();
        let bytes: Vec<u8> = buf.iter().map(|&v| v as u8).collect();
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        e.write_all(bytes.as_slice()).expect("Compression error");
        CompactMarkSlice {
            buf: e.finish().expect("Compression error"),
            sh: self.shape(),
        }
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 压缩存储的标注层水平切片; 不透明类型.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompactMarkSlice {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状.
    sh: Idx2d,
}

impl CompactMarkSlice {
    /// 解压缩数据.
    pub fn decompress(self) -> OwnedGridSlice<i8> {
        let Self { buf, sh: (h, w) } = self;
        let mut d = ZlibDecoder::new(buf.as_slice());
        let mut buf = Vec::with_capacity(h * w);
        d.read_to_end(&mut buf).expect("Decompression error");
        debug_assert_eq!(buf.len(), h * w);
        let data = buf.into_iter().map(|v| v as i8).collect();
        let data = Array2::<i8>::from_shape_vec((h, w), data).unwrap();
        OwnedGridSlice { data }
    }

    /// 切片形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.sh
    }
}

#[cfg(test)]
mod tests {
    use crate::MarkGrid;

    /// 镜像提取后回填应逐像素还原.
    #[test]
    fn test_mirror_resume() {
        let mut g = MarkGrid::zeroed((1, 2, 3));
        g[(0, 0, 1)] = 1;
        g[(0, 1, 2)] = -1;
        let saved = g.slice_at(0).mirror();

        g.slice_at_mut(0).fill(0);
        assert_eq!(g[(0, 0, 1)], 0);

        g.slice_at_mut(0).resume(&saved);
        assert_eq!(g[(0, 0, 1)], 1);
        assert_eq!(g[(0, 1, 2)], -1);
    }

    /// 压缩/解压往返应保持内容与形状, 包括负值.
    #[test]
    fn test_compact_round_trip() {
        let mut g = MarkGrid::zeroed((1, 3, 4));
        g[(0, 0, 0)] = -1;
        g[(0, 2, 3)] = 1;

        let compact = g.slice_at(0).compress();
        assert_eq!(compact.shape(), (3, 4));

        let restored = compact.decompress();
        let view = restored.as_immut();
        assert_eq!(view[(0, 0)], -1);
        assert_eq!(view[(2, 3)], 1);
        assert_eq!(view.count(0), 10);
    }
}
