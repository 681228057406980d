//! 多标注者一致度聚合.
//!
//! 只读地把 N 个标注者的标注层按像素归并为同意人数,
//! 供可视化端映射为热度显示. 每次显示刷新调用一次.

use itertools::izip;
use ndarray::Array2;

use crate::consts::mark::*;
use crate::data::ImgWriteVis;
use crate::{Idx2d, Idx3d, MarkGrid};

/// 聚合错误.
#[derive(Debug)]
pub enum AggregateError {
    /// 某标注者的标注层形状与体数据声明的形状不一致.
    ShapeMismatch {
        /// 标注者名.
        name: String,

        /// 体数据声明的形状.
        expected: Idx3d,

        /// 实际拿到的形状.
        actual: Idx3d,
    },
}

/// 一致度统计的口径.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AggregateMode {
    /// 仅统计手动修正层的手动加入.
    Manual,

    /// 仅统计区域标注层.
    Sp,

    /// 统计两层叠加后的完整标注.
    #[default]
    Both,
}

impl AggregateMode {
    /// 给定像素的两层取值在该口径下是否计为 "已标注"?
    #[inline]
    pub fn counts(self, sp: i8, corr: i8) -> bool {
        match self {
            Self::Sp => is_sp_lesion(sp),
            Self::Manual => is_corr_added(corr),
            Self::Both => is_effective(sp, corr),
        }
    }
}

/// 一个标注者的两个标注层.
#[derive(Debug)]
pub struct AnnotatorMarks {
    name: String,
    sp: MarkGrid,
    manual: MarkGrid,
}

impl AnnotatorMarks {
    /// 组装一个标注者的数据. 两层形状必须一致.
    pub fn new(name: String, sp: MarkGrid, manual: MarkGrid) -> Result<Self, AggregateError> {
        if sp.shape() != manual.shape() {
            return Err(AggregateError::ShapeMismatch {
                name,
                expected: sp.shape(),
                actual: manual.shape(),
            });
        }
        Ok(Self { name, sp, manual })
    }

    /// 标注者名.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 多标注者一致度聚合器. 纯只读归约, 不做任何变更.
#[derive(Debug)]
pub struct AnnotationAggregator {
    shape: Idx3d,
    annotators: Vec<AnnotatorMarks>,
}

impl AnnotationAggregator {
    /// 以体数据形状与各标注者数据组装聚合器.
    ///
    /// 任一标注者的层形状与 `shape` 不符都是致命错误.
    pub fn new(shape: Idx3d, annotators: Vec<AnnotatorMarks>) -> Result<Self, AggregateError> {
        for ann in &annotators {
            if ann.sp.shape() != shape {
                return Err(AggregateError::ShapeMismatch {
                    name: ann.name.clone(),
                    expected: shape,
                    actual: ann.sp.shape(),
                });
            }
        }
        Ok(Self { shape, annotators })
    }

    /// 标注者个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.annotators.len()
    }

    /// 是否没有任何标注者.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.annotators.is_empty()
    }

    /// 按装入顺序迭代标注者名.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.annotators.iter().map(|a| a.name())
    }

    /// 体数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 统计 `selected` 给出的标注者中, 有多少人在该口径下认为
    /// 第 `z` 切片的 `pos` 像素已标注.
    ///
    /// `selected` 中的值是标注者下标, 必须互不相同且在范围内,
    /// 否则属于编程缺陷 (程序 panic 或重复计数).
    pub fn combined_count(
        &self,
        z: usize,
        pos: Idx2d,
        selected: &[usize],
        mode: AggregateMode,
    ) -> u32 {
        let p3 = (z, pos.0, pos.1);
        selected
            .iter()
            .filter(|&&i| {
                let ann = &self.annotators[i];
                mode.counts(ann.sp[p3], ann.manual[p3])
            })
            .count() as u32
    }

    /// 对第 `z` 切片整体做一次一致度归并.
    ///
    /// `selected` 的约束同 [`Self::combined_count`]. 当 `z` 越界时 panic.
    pub fn aggregate_slice(
        &self,
        z: usize,
        selected: &[usize],
        mode: AggregateMode,
    ) -> AgreementMap {
        let (_, h, w) = self.shape;
        let mut counts = Array2::<u32>::zeros((h, w));

        for &i in selected {
            let ann = &self.annotators[i];
            let sp = ann.sp.slice_at(z);
            let corr = ann.manual.slice_at(z);
            for (s, c, out) in izip!(sp.iter(), corr.iter(), counts.iter_mut()) {
                if mode.counts(*s, *c) {
                    *out += 1;
                }
            }
        }

        AgreementMap {
            counts,
            selected: selected.len(),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 并发操作部分.
        impl AnnotationAggregator {
            /// 借助 `rayon`, 并行地对所有切片做一致度归并.
            /// 结果按切片序号升序排列.
            pub fn par_aggregate_all(
                &self,
                selected: &[usize],
                mode: AggregateMode,
            ) -> Vec<AgreementMap> {
                (0..self.shape.0)
                    .into_par_iter()
                    .map(|z| self.aggregate_slice(z, selected, mode))
                    .collect()
            }
        }
    }
}

/// 一个切片的一致度归并结果: 每像素的同意人数与参与统计的人数.
#[derive(Debug, Clone)]
pub struct AgreementMap {
    counts: Array2<u32>,
    selected: usize,
}

impl AgreementMap {
    /// `pos` 处的同意人数.
    #[inline]
    pub fn count_at(&self, pos: Idx2d) -> u32 {
        self.counts[pos]
    }

    /// 参与统计的标注者人数.
    #[inline]
    pub fn selected_len(&self) -> usize {
        self.selected
    }

    /// 归并结果的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.counts.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 底层计数矩阵视图.
    #[inline]
    pub fn counts(&self) -> ndarray::ArrayView2<'_, u32> {
        self.counts.view()
    }
}

/// 同意人数按比例映射为灰度: 0 人为全黑, 全员同意为全白.
impl ImgWriteVis for AgreementMap {
    fn save<P: AsRef<std::path::Path>>(&self, path: P) -> image::ImageResult<()> {
        let (h, w) = self.shape();
        let total = self.selected.max(1) as u32;
        let mut buf = image::GrayImage::new(w as u32, h as u32);
        for ((row, col), &cnt) in self.counts.indexed_iter() {
            let gray = (cnt * 255 / total) as u8;
            buf.put_pixel(col as u32, row as u32, image::Luma([gray]));
        }
        buf.save(path)
    }
}
