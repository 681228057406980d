use ndarray::iter::{Iter, IterMut};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Ix2};
use std::borrow::Cow;
use std::ops::{Index, IndexMut};

use crate::Idx2d;

/// 不可变、借用的二维水平切片视图.
pub struct GridSlice<'a, T> {
    /// 底层数据的轻量级视图, 借用于 [`crate::VolumeGrid`].
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, T>,
}

impl<T> Index<Idx2d> for GridSlice<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

/// 可变、借用的二维水平切片视图.
pub struct GridSliceMut<'a, T> {
    /// 底层数据的轻量级视图, 借用于 [`crate::VolumeGrid`].
    ///
    /// 这里有意把代码写死为 `ArrayViewMut` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayViewMut2<'a, T>,
}

/// 可变方法集合.
impl<'a, T: Copy> GridSliceMut<'a, T> {
    /// 获得 **底层** 数据的一份可变 shallow copy.
    #[inline]
    pub fn array_view_mut(&mut self) -> ArrayViewMut2<T> {
        self.data.view_mut()
    }

    /// 获取可以迭代并修改切片像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T, Ix2> {
        self.data.iter_mut()
    }

    /// 获取给定位置 (高, 宽) 的像素值, 并可就地修改. 越界时返回 `None`.
    #[inline]
    pub fn get_mut(&mut self, pos: Idx2d) -> Option<&mut T> {
        self.data.get_mut(pos)
    }

    /// 将整个切片填充为 `value`.
    #[inline]
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// 将 `it` 中的每个索引对应的像素改为 `new`.
    pub fn fill_batch<I: IntoIterator<Item = Idx2d>>(&mut self, it: I, new: T) {
        for pos in it.into_iter() {
            self[pos] = new;
        }
    }
}

impl<T> Index<Idx2d> for GridSliceMut<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<Idx2d> for GridSliceMut<'_, T> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 不可变方法集合.
macro_rules! impl_grid_slice_immut {
    ($life: lifetime, $slice: ty, $array: ty) => {
        /// 不可变方法集合.
        impl<$life, T: Copy> $slice {
            /// 直接初始化.
            #[inline]
            pub(crate) fn new(data: $array) -> Self {
                Self { data }
            }

            /// 获得 **底层** 数据的一份不可变 shallow copy.
            #[inline]
            pub fn array_view(&self) -> ArrayView2<T> {
                self.data.view()
            }

            /// 获取可以迭代切片像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, T, Ix2> {
                self.data.iter()
            }

            /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&T> {
                self.data.get(pos)
            }

            /// 切片的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                let &[h, w] = self.data.shape() else {
                    unreachable!()
                };
                (h, w)
            }

            /// 切片的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                let (h, w) = self.shape();
                h * w
            }

            /// 判断一个索引是否合法 (未越界).
            #[inline]
            pub fn check(&self, (h, w): Idx2d) -> bool {
                let (h_len, w_len) = self.shape();
                h < h_len && w < w_len
            }

            /// 获得切片的高.
            #[inline]
            pub fn height(&self) -> usize {
                self.shape().0
            }

            /// 获得切片的宽.
            #[inline]
            pub fn width(&self) -> usize {
                self.shape().1
            }

            /// 将切片转化为行优先的序列化存储.
            pub fn as_row_major_vec(&self) -> Vec<T> {
                let mut buf = Vec::with_capacity(self.size());
                buf.extend(self.iter());
                buf
            }

            /// 获得行优先存储的序列化数据.
            /// 当原始数据本身就是行优先格式时, 可以避免一次 deepcopy.
            pub fn as_row_major_slice(&self) -> Cow<[T]> {
                if self.data.is_standard_layout() {
                    Cow::Borrowed(self.data.as_slice().unwrap())
                } else {
                    Cow::Owned(self.as_row_major_vec())
                }
            }

            /// 以行优先规则, 获取能迭代切片所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &T)> {
                self.data.indexed_iter()
            }

            /// 获得一份不可变的 **本体** shallow copy.
            #[inline]
            pub fn shallow_copy(&self) -> GridSlice<T> {
                GridSlice {
                    data: self.array_view(),
                }
            }

            /// 克隆自己, 获得一个拥有所有权的切片对象.
            pub fn to_owned(&self) -> OwnedGridSlice<T> {
                OwnedGridSlice {
                    data: self.data.to_owned(),
                }
            }
        }

        /// 统计类方法集合.
        impl<$life, T: Copy + PartialEq> $slice {
            /// 统计切片中值为 `target` 的像素总个数.
            #[inline]
            pub fn count(&self, target: T) -> usize {
                self.data.iter().filter(|&p| *p == target).count()
            }
        }
    };
}
impl_grid_slice_immut!('a, GridSlice<'a, T>, ArrayView2<'a, T>);
impl_grid_slice_immut!('a, GridSliceMut<'a, T>, ArrayViewMut2<'a, T>);

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 拥有所有权的二维水平切片.
///
/// `OwnedGridSlice` 仅提供到 [`GridSlice`] 和 [`GridSliceMut`]
/// 的轻量转换和底层数据移动, 不提供任何其它方法.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct OwnedGridSlice<T> {
    pub(crate) data: Array2<T>,
}

impl<T> OwnedGridSlice<T> {
    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immut(&self) -> GridSlice<'_, T> {
        GridSlice {
            data: self.data.view(),
        }
    }

    /// 获得可变切片引用.
    #[inline]
    pub fn as_mutable(&mut self) -> GridSliceMut<'_, T> {
        GridSliceMut {
            data: self.data.view_mut(),
        }
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<T> {
        self.data
    }
}
