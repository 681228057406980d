use std::ops::{Index, IndexMut};

use itertools::izip;
use ndarray::{Array3, ArrayView, ArrayViewMut, Axis, Ix3};

use crate::consts::mark::*;
use crate::naming::VolumeMeta;
use crate::{Idx2d, Idx2dI32, Idx3d};

pub mod slice;

pub use slice::{
    CompactMarkSlice, GridSlice, GridSliceMut, ImgWriteRaw, ImgWriteVis, MarkMirror,
    OwnedGridSlice,
};

/// 固定形状的三维体数据网格, 以 `(切片, 高, 宽)` 索引.
///
/// 形状在构造时确定, 此后不可变更. 同一体数据的所有层共享同一形状.
#[derive(Debug, Clone)]
pub struct VolumeGrid<T> {
    data: Array3<T>,
}

impl<T> VolumeGrid<T> {
    /// 从既有数组直接构造. 数组必须是行优先标准布局.
    #[inline]
    pub(crate) fn from_array(data: Array3<T>) -> Self {
        debug_assert!(data.is_standard_layout());
        Self { data }
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let &[z, h, w] = self.data.shape() else {
            unreachable!()
        };
        (z, h, w)
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 将带符号图像坐标按第 `z` 切片转换为网格内三维索引.
    /// 坐标取负或越界时返回 `None`.
    #[inline]
    pub fn check_signed(&self, z: usize, (h, w): Idx2dI32) -> Option<Idx3d> {
        if h < 0 || w < 0 {
            return None;
        }
        let pos = (z, h as usize, w as usize);
        self.check(&pos).then_some(pos)
    }

    /// 获取给定位置的体素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<&T> {
        self.data.get(pos)
    }

    /// 获取给定位置的体素值, 并可就地修改. 越界时返回 `None`.
    #[inline]
    pub fn get_mut(&mut self, pos: Idx3d) -> Option<&mut T> {
        self.data.get_mut(pos)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, T, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, T, Ix3> {
        self.data.view_mut()
    }
}

impl<T: Copy> VolumeGrid<T> {
    /// 获取 z 空间的第 `z_index` 层不可变切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> GridSlice<'_, T> {
        GridSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取 z 空间的第 `z_index` 层可变切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at_mut(&mut self, z_index: usize) -> GridSliceMut<'_, T> {
        GridSliceMut::new(self.data.index_axis_mut(Axis(0), z_index))
    }

    /// 获取能按升序迭代水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = GridSlice<T>> {
        self.data.axis_iter(Axis(0)).map(GridSlice::new)
    }

    /// 获取能按升序迭代水平可变切片的迭代器.
    #[inline]
    pub fn slice_iter_mut(&mut self) -> impl ExactSizeIterator<Item = GridSliceMut<T>> {
        self.data.axis_iter_mut(Axis(0)).map(GridSliceMut::new)
    }
}

impl<T: Copy + Default> VolumeGrid<T> {
    /// 以元素默认值构造给定形状的网格.
    pub fn zeroed(shape: Idx3d) -> Self {
        Self {
            data: Array3::from_elem(shape, T::default()),
        }
    }
}

impl<T: Copy + PartialEq> VolumeGrid<T> {
    /// 获取网格中值为 `target` 的体素个数.
    #[inline]
    pub fn count(&self, target: T) -> usize {
        self.data.iter().filter(|p| **p == target).count()
    }
}

impl<T> Index<Idx3d> for VolumeGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<Idx3d> for VolumeGrid<T> {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// STIR 扫描强度网格.
pub type ScanGrid = VolumeGrid<u16>;

/// 超像素分割标签网格. 两个像素属于同一区域当且仅当标签值相等.
pub type SuperpixelGrid = VolumeGrid<u16>;

/// 超像素边界旗标网格. 仅用于可选的网格叠加显示.
pub type BorderGrid = VolumeGrid<bool>;

/// 标注层网格. 区域标注层与手动修正层共用该元素类型.
pub type MarkGrid = VolumeGrid<i8>;

impl ScanGrid {
    /// 将扫描样本全体线性重缩放到满量程. 在加载时执行一次.
    ///
    /// 缩放系数为整数商 `65535 / max` (max 至少取 1, 避免除零),
    /// 先截断求商再逐样本相乘, 与历史数据保持逐位一致.
    pub fn rescale_to_full_range(&mut self) {
        let max = self.data.iter().copied().max().unwrap_or(0).max(1);
        let factor = u32::from(crate::consts::INTENSITY_FULL_SCALE) / u32::from(max);
        for v in self.data.iter_mut() {
            // factor * v <= factor * max <= 65535, 不会溢出.
            *v = (factor * u32::from(*v)) as u16;
        }
    }
}

/// 一次打开的完整标注体数据: 扫描、超像素分割、可选边界层与两个标注层.
///
/// 所有层共享同一形状. 标注层的取值约束 (区域层 ∈ {0, 1},
/// 修正层 ∈ {-1, 0, 1}) 由本结构的编辑操作维护, 破坏该约束属于编程缺陷.
#[derive(Debug, Clone)]
pub struct AnnotatedVolume {
    meta: VolumeMeta,
    scan: ScanGrid,
    superpixel: SuperpixelGrid,
    border: Option<BorderGrid>,
    sp_annotation: MarkGrid,
    manual_correction: MarkGrid,
    dirty: bool,
}

impl AnnotatedVolume {
    /// 从各层直接组装. 各层形状必须一致, 否则程序 panic.
    pub(crate) fn new(
        meta: VolumeMeta,
        scan: ScanGrid,
        superpixel: SuperpixelGrid,
        border: Option<BorderGrid>,
        sp_annotation: MarkGrid,
        manual_correction: MarkGrid,
    ) -> Self {
        assert_eq!(scan.shape(), superpixel.shape(), "超像素层形状不一致");
        if let Some(b) = &border {
            assert_eq!(scan.shape(), b.shape(), "边界层形状不一致");
        }
        assert_eq!(scan.shape(), sp_annotation.shape(), "区域标注层形状不一致");
        assert_eq!(
            scan.shape(),
            manual_correction.shape(),
            "手动修正层形状不一致"
        );
        Self {
            meta,
            scan,
            superpixel,
            border,
            sp_annotation,
            manual_correction,
            dirty: false,
        }
    }

    /// 从扫描和超像素标签直接拼装实体, 标注层全部置零.
    ///
    /// # 注意
    ///
    /// 该方法以形状信息伪造元信息, 可能与磁盘上的任何文件都不对应,
    /// 因此你应仅将其用于实验目的.
    pub fn synthetic(scan: ScanGrid, superpixel: SuperpixelGrid) -> Self {
        let shape = scan.shape();
        Self::new(
            VolumeMeta::synthetic(shape),
            scan,
            superpixel,
            None,
            MarkGrid::zeroed(shape),
            MarkGrid::zeroed(shape),
        )
    }

    /// 体数据的元信息.
    #[inline]
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }

    /// 扫描强度层.
    #[inline]
    pub fn scan(&self) -> &ScanGrid {
        &self.scan
    }

    /// 超像素分割标签层.
    #[inline]
    pub fn superpixel(&self) -> &SuperpixelGrid {
        &self.superpixel
    }

    /// 超像素边界旗标层. 对应文件缺失时为 `None`, 此时网格叠加显示不可用.
    #[inline]
    pub fn border(&self) -> Option<&BorderGrid> {
        self.border.as_ref()
    }

    /// 区域标注层.
    #[inline]
    pub fn sp_annotation(&self) -> &MarkGrid {
        &self.sp_annotation
    }

    /// 手动修正层.
    #[inline]
    pub fn manual_correction(&self) -> &MarkGrid {
        &self.manual_correction
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.scan.shape()
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.scan.len_z()
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        self.scan.slice_shape()
    }

    /// 自上次成功保存以来, 标注层是否发生过变更?
    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// 标记标注层已变更.
    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// 在两个标注层都成功落盘后清除变更标记.
    #[inline]
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// 两层叠加后, 第 `z` 切片上 `pos` 处是否呈现为病灶?
    ///
    /// 索引越界时 panic.
    #[inline]
    pub fn is_lesion(&self, z: usize, (h, w): Idx2d) -> bool {
        is_effective(self.sp_annotation[(z, h, w)], self.manual_correction[(z, h, w)])
    }

    /// 第 `z` 切片上呈现为病灶的像素总数.
    pub fn lesion_count(&self, z: usize) -> usize {
        let sp = self.sp_annotation.slice_at(z);
        let corr = self.manual_correction.slice_at(z);
        izip!(sp.iter(), corr.iter())
            .filter(|(s, c)| is_effective(**s, **c))
            .count()
    }

    /// 拆出元信息与扫描层, 供重配置时复用. 其余各层被丢弃.
    #[inline]
    pub(crate) fn into_meta_scan(self) -> (VolumeMeta, ScanGrid) {
        (self.meta, self.scan)
    }

    /// 区域标注层的可变切片视图. 仅限编辑算法使用.
    #[inline]
    pub(crate) fn layers_at_mut(
        &mut self,
        z: usize,
    ) -> (GridSliceMut<'_, i8>, GridSliceMut<'_, i8>) {
        (
            self.sp_annotation.slice_at_mut(z),
            self.manual_correction.slice_at_mut(z),
        )
    }

    /// 编辑算法内部的分层可变访问.
    #[inline]
    pub(crate) fn split_for_edit(&mut self) -> (&SuperpixelGrid, &mut MarkGrid, &mut MarkGrid) {
        (
            &self.superpixel,
            &mut self.sp_annotation,
            &mut self.manual_correction,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn grid_from(shape: Idx3d, data: Vec<u16>) -> VolumeGrid<u16> {
        VolumeGrid::from_array(Array3::from_shape_vec(shape, data).unwrap())
    }

    /// 形状、检查与索引的基本行为.
    #[test]
    fn test_grid_shape_and_check() {
        let g = MarkGrid::zeroed((2, 3, 4));
        assert_eq!(g.shape(), (2, 3, 4));
        assert_eq!(g.slice_shape(), (3, 4));
        assert_eq!(g.len_z(), 2);
        assert_eq!(g.size(), 24);

        assert!(g.check(&(1, 2, 3)));
        assert!(!g.check(&(2, 0, 0)));
        assert!(!g.check(&(0, 3, 0)));
        assert!(!g.check(&(0, 0, 4)));

        assert_eq!(g.get((1, 2, 3)), Some(&0));
        assert_eq!(g.get((1, 2, 4)), None);
    }

    /// 带符号坐标转换: 取负与越界都返回 `None`.
    #[test]
    fn test_grid_check_signed() {
        let g = MarkGrid::zeroed((1, 4, 4));
        assert_eq!(g.check_signed(0, (0, 0)), Some((0, 0, 0)));
        assert_eq!(g.check_signed(0, (3, 3)), Some((0, 3, 3)));
        assert_eq!(g.check_signed(0, (-1, 0)), None);
        assert_eq!(g.check_signed(0, (0, -1)), None);
        assert_eq!(g.check_signed(0, (4, 0)), None);
        assert_eq!(g.check_signed(1, (0, 0)), None);
    }

    /// 重缩放系数为截断整数商: max = 100 时系数恰为 655.
    #[test]
    fn test_rescale_truncating_factor() {
        let mut g = grid_from((1, 1, 3), vec![0, 50, 100]);
        g.rescale_to_full_range();
        assert_eq!(g[(0, 0, 0)], 0);
        assert_eq!(g[(0, 0, 1)], 655 * 50);
        assert_eq!(g[(0, 0, 2)], 655 * 100); // 65500, 而非 65535.
    }

    /// 满量程输入重缩放后不变.
    #[test]
    fn test_rescale_full_scale_fixed_point() {
        let mut g = grid_from((1, 1, 2), vec![65535, 1]);
        g.rescale_to_full_range();
        assert_eq!(g[(0, 0, 0)], 65535);
        assert_eq!(g[(0, 0, 1)], 1);
    }

    /// 全零体数据重缩放不除零.
    #[test]
    fn test_rescale_all_zero() {
        let mut g = grid_from((1, 2, 2), vec![0; 4]);
        g.rescale_to_full_range();
        assert!(g.data().iter().all(|&v| v == 0));
    }

    /// 叠加规则: `sp + corr > 0`.
    #[test]
    fn test_effective_state() {
        let scan = ScanGrid::zeroed((1, 2, 2));
        let sp = SuperpixelGrid::zeroed((1, 2, 2));
        let mut vol = AnnotatedVolume::synthetic(scan, sp);

        assert!(!vol.is_lesion(0, (0, 0)));
        vol.sp_annotation[(0, 0, 0)] = 1;
        assert!(vol.is_lesion(0, (0, 0)));
        vol.manual_correction[(0, 0, 0)] = -1;
        assert!(!vol.is_lesion(0, (0, 0)));
        vol.manual_correction[(0, 1, 1)] = 1;
        assert!(vol.is_lesion(0, (1, 1)));
        assert_eq!(vol.lesion_count(0), 1);
    }
}
