//! 编辑会话.
//!
//! 把指针交互建模为显式状态机: 指针状态 (空闲/左键绘制/右键绘制)
//! 与编辑模式 (区域选择/手动修正) 正交, 渲染开关收拢为一个
//! [`DisplayOptions`] 值对象随渲染调用传递, 不做可变全局量.
//!
//! 所有变更都在一个控制线程上同步完成, 没有操作会挂起或后台运行.

use crate::annotate::PenSize;
use crate::data::CompactMarkSlice;
use crate::dataset::{self, LoadError, SaveError, VolumePaths};
use crate::{AnnotatedVolume, Idx2dI32};

/// 编辑模式. 与指针状态正交.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum EditMode {
    /// 区域选择: 点击/拖动对超像素区域做整体反转.
    #[default]
    RegionSelect,

    /// 手动修正: 自由手绘逐像素覆盖.
    FreehandCorrect,
}

impl EditMode {
    /// 在两种模式间切换.
    #[inline]
    pub fn toggle(&mut self) {
        *self = match self {
            Self::RegionSelect => Self::FreehandCorrect,
            Self::FreehandCorrect => Self::RegionSelect,
        };
    }

    /// 是否为手动修正模式?
    #[inline]
    pub fn is_freehand(&self) -> bool {
        matches!(self, Self::FreehandCorrect)
    }
}

/// 指针按键. 左键标入, 右键标出.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PointerButton {
    /// 左键.
    Left,

    /// 右键.
    Right,
}

impl PointerButton {
    /// 该按键对应的编辑方向: 左键加入, 右键移出.
    #[inline]
    pub fn adding(self) -> bool {
        matches!(self, Self::Left)
    }
}

/// 指针交互状态机. 绘制态携带当前笔画最近一次记录的点.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PointerState {
    /// 没有按键按下.
    #[default]
    Idle,

    /// 左键按下, 正在绘制.
    PaintingLeft(Idx2dI32),

    /// 右键按下, 正在绘制.
    PaintingRight(Idx2dI32),
}

impl PointerState {
    /// 当前绘制方向与最近记录点. 空闲时返回 `None`.
    #[inline]
    fn active(&self) -> Option<(bool, Idx2dI32)> {
        match *self {
            Self::Idle => None,
            Self::PaintingLeft(last) => Some((true, last)),
            Self::PaintingRight(last) => Some((false, last)),
        }
    }

    /// 保持按键方向, 把最近记录点前移到 `pos`.
    #[inline]
    fn advance(&mut self, pos: Idx2dI32) {
        *self = match *self {
            Self::Idle => Self::Idle,
            Self::PaintingLeft(_) => Self::PaintingLeft(pos),
            Self::PaintingRight(_) => Self::PaintingRight(pos),
        };
    }
}

/// 渲染开关值对象, 随渲染调用传递.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplayOptions {
    /// 是否叠加显示标注.
    pub show_annotations: bool,

    /// 是否叠加显示超像素边界网格.
    pub show_grid: bool,
}

impl Default for DisplayOptions {
    #[inline]
    fn default() -> Self {
        Self {
            show_annotations: true,
            show_grid: false,
        }
    }
}

/// 一步重置撤销的压缩快照.
#[derive(Debug)]
struct ResetUndo {
    z: usize,
    sp: CompactMarkSlice,
    corr: CompactMarkSlice,
}

/// 标注编辑会话: 一卷打开的体数据与围绕它的全部交互状态.
///
/// 体数据由会话独占; 不存在跨卷共享, 也没有并发访问.
#[derive(Debug, Default)]
pub struct AnnotationSession {
    volume: Option<AnnotatedVolume>,
    paths: Option<VolumePaths>,
    slice: usize,
    pen: PenSize,
    mode: EditMode,
    pointer: PointerState,
    display: DisplayOptions,
    undo: Option<ResetUndo>,
}

impl AnnotationSession {
    /// 创建空会话.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 以现成的体数据建立会话, 不关联任何磁盘路径.
    ///
    /// 仅用于实验目的; 此时 [`Self::save`] 无事可做.
    pub(crate) fn with_volume(volume: AnnotatedVolume) -> Self {
        Self {
            volume: Some(volume),
            ..Self::default()
        }
    }

    /// 打开一卷体数据并使其成为会话当前卷.
    ///
    /// 之前打开的卷 (若有) 被直接丢弃. 未保存变更的提示是外壳的责任,
    /// 调用方应先检查 [`Self::is_dirty`].
    pub fn open(&mut self, paths: VolumePaths) -> Result<(), LoadError> {
        let volume = dataset::open_volume(&paths)?;
        self.volume = Some(volume);
        self.paths = Some(paths);
        self.slice = 0;
        self.pointer = PointerState::Idle;
        self.undo = None;
        Ok(())
    }

    /// 关闭当前卷, 丢弃所有内存中状态.
    pub fn close(&mut self) {
        self.volume = None;
        self.paths = None;
        self.slice = 0;
        self.pointer = PointerState::Idle;
        self.undo = None;
    }

    /// 换一套 (分割方法, 超像素档位) 选择器重开当前卷.
    ///
    /// 形状与标签数据只能经由整卷重开变更: 扫描层连同其形状被原样复用,
    /// 超像素/边界/标注各层按新路径全部重读. 未保存变更被丢弃
    /// (提示仍是外壳的责任). 若当前没有打开的卷, 则等价于 [`Self::open`].
    /// 重开失败时会话回到未打开状态, 不留半成品.
    pub fn reconfigure(&mut self, paths: VolumePaths) -> Result<(), LoadError> {
        let Some(volume) = self.volume.take() else {
            return self.open(paths);
        };
        self.close();

        let (meta, scan) = volume.into_meta_scan();
        let volume = dataset::reopen_with_scan(scan, meta, &paths)?;
        self.volume = Some(volume);
        self.paths = Some(paths);
        Ok(())
    }

    /// 保存当前卷的两个标注层. 成功后变更标记清除.
    ///
    /// 没有打开的卷或没有关联路径时无事可做.
    pub fn save(&mut self) -> Result<(), SaveError> {
        if let (Some(volume), Some(paths)) = (&mut self.volume, &self.paths) {
            dataset::save_annotations(volume, paths)?;
        }
        Ok(())
    }

    /// 会话当前是否有打开的卷?
    #[inline]
    pub fn is_open(&self) -> bool {
        self.volume.is_some()
    }

    /// 当前卷是否有未保存变更? 没有打开的卷时恒为否.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.volume.as_ref().is_some_and(AnnotatedVolume::dirty)
    }

    /// 当前卷.
    #[inline]
    pub fn volume(&self) -> Option<&AnnotatedVolume> {
        self.volume.as_ref()
    }

    /// 当前切片序号.
    #[inline]
    pub fn slice(&self) -> usize {
        self.slice
    }

    /// 切换到第 `z` 切片. 越界的输入被钳制到 `[0, 切片数)`.
    pub fn set_slice(&mut self, z: usize) {
        let len = self.volume.as_ref().map_or(0, AnnotatedVolume::len_z);
        self.slice = z.min(len.saturating_sub(1));
    }

    /// 切换到下一切片 (最后一片时保持不动).
    #[inline]
    pub fn next_slice(&mut self) {
        self.set_slice(self.slice.saturating_add(1));
    }

    /// 切换到上一切片 (第一片时保持不动).
    #[inline]
    pub fn previous_slice(&mut self) {
        self.set_slice(self.slice.saturating_sub(1));
    }

    /// 当前笔刷半径.
    #[inline]
    pub fn pen(&self) -> PenSize {
        self.pen
    }

    /// 直接设置笔刷半径 (自动钳制).
    #[inline]
    pub fn set_pen(&mut self, radius: u8) {
        self.pen = PenSize::new(radius);
    }

    /// 笔刷半径加一.
    #[inline]
    pub fn widen_pen(&mut self) {
        self.pen.widen();
    }

    /// 笔刷半径减一.
    #[inline]
    pub fn narrow_pen(&mut self) {
        self.pen.narrow();
    }

    /// 当前编辑模式.
    #[inline]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// 在区域选择与手动修正两种模式间切换.
    #[inline]
    pub fn toggle_mode(&mut self) {
        self.mode.toggle();
    }

    /// 当前指针状态.
    #[inline]
    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    /// 当前渲染开关.
    #[inline]
    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    /// 翻转标注叠加显示开关.
    #[inline]
    pub fn toggle_annotations_display(&mut self) {
        self.display.show_annotations = !self.display.show_annotations;
    }

    /// 翻转边界网格叠加显示开关.
    #[inline]
    pub fn toggle_grid_display(&mut self) {
        self.display.show_grid = !self.display.show_grid;
    }

    /// 指针按下事件.
    ///
    /// 区域选择模式下立即做一次区域反转; 手动修正模式下盖一次圆盘印章
    /// 并把 `pos` 记作笔画起点. 没有打开的卷时忽略.
    pub fn pointer_pressed(&mut self, button: PointerButton, pos: Idx2dI32) {
        let Some(volume) = &mut self.volume else {
            return;
        };
        let adding = button.adding();
        if self.mode.is_freehand() {
            volume.paint_point(self.slice, pos, self.pen, adding);
        } else {
            volume.toggle_region(self.slice, pos, adding);
        }
        self.pointer = match button {
            PointerButton::Left => PointerState::PaintingLeft(pos),
            PointerButton::Right => PointerState::PaintingRight(pos),
        };
    }

    /// 指针移动事件.
    ///
    /// 空闲状态下忽略. 手动修正模式下沿最近记录点到 `pos` 的线段补画;
    /// 区域选择模式下对新位置再做一次区域反转 (与历史行为一致).
    pub fn pointer_moved(&mut self, pos: Idx2dI32) {
        self.apply_pointer(pos);
    }

    /// 指针松开事件. 先按移动事件处理最后一段, 然后回到空闲状态.
    pub fn pointer_released(&mut self, pos: Idx2dI32) {
        self.apply_pointer(pos);
        self.pointer = PointerState::Idle;
    }

    fn apply_pointer(&mut self, pos: Idx2dI32) {
        let Some((adding, last)) = self.pointer.active() else {
            return;
        };
        let Some(volume) = &mut self.volume else {
            return;
        };
        if self.mode.is_freehand() {
            volume.paint_to(self.slice, last, pos, self.pen, adding);
        } else {
            volume.toggle_region(self.slice, pos, adding);
        }
        self.pointer.advance(pos);
    }

    /// 把当前切片的两个标注层全部归零, 并留存一步撤销快照.
    ///
    /// 没有打开的卷时返回 `false`.
    pub fn reset_slice(&mut self) -> bool {
        let z = self.slice;
        let Some(volume) = &mut self.volume else {
            return false;
        };
        let sp = volume.sp_annotation().slice_at(z).compress();
        let corr = volume.manual_correction().slice_at(z).compress();
        volume.reset_slice(z);
        self.undo = Some(ResetUndo { z, sp, corr });
        true
    }

    /// 撤销最近一次切片重置. 没有可撤销的快照时返回 `false`.
    pub fn undo_reset(&mut self) -> bool {
        let Some(volume) = &mut self.volume else {
            return false;
        };
        let Some(ResetUndo { z, sp, corr }) = self.undo.take() else {
            return false;
        };
        let sp = sp.decompress();
        let corr = corr.decompress();
        volume.restore_slice(z, &sp.as_immut().mirror(), &corr.as_immut().mirror());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnnotatedVolume, Idx3d, ScanGrid, SuperpixelGrid};

    fn blank_session(shape: Idx3d) -> AnnotationSession {
        AnnotationSession::with_volume(AnnotatedVolume::synthetic(
            ScanGrid::zeroed(shape),
            SuperpixelGrid::zeroed(shape),
        ))
    }

    /// 切片切换的钳制行为.
    #[test]
    fn test_slice_clamp() {
        let mut s = blank_session((3, 2, 2));
        assert_eq!(s.slice(), 0);
        s.previous_slice();
        assert_eq!(s.slice(), 0);
        s.set_slice(99);
        assert_eq!(s.slice(), 2);
        s.next_slice();
        assert_eq!(s.slice(), 2);
        s.previous_slice();
        assert_eq!(s.slice(), 1);

        // 空会话: 一切归零.
        let mut empty = AnnotationSession::new();
        empty.set_slice(5);
        assert_eq!(empty.slice(), 0);
    }

    /// 指针状态机: 按下进入绘制态, 移动前移记录点, 松开回到空闲.
    #[test]
    fn test_pointer_state_machine() {
        let mut s = blank_session((1, 8, 8));
        s.toggle_mode();
        assert!(s.mode().is_freehand());

        assert_eq!(s.pointer(), PointerState::Idle);
        s.pointer_moved((3, 3)); // 空闲时移动被忽略.
        assert!(!s.is_dirty());

        s.pointer_pressed(PointerButton::Left, (1, 1));
        assert_eq!(s.pointer(), PointerState::PaintingLeft((1, 1)));

        s.pointer_moved((1, 3));
        assert_eq!(s.pointer(), PointerState::PaintingLeft((1, 3)));

        s.pointer_released((1, 4));
        assert_eq!(s.pointer(), PointerState::Idle);

        // 半径默认 3, 但线段本身必被覆盖.
        let vol = s.volume().unwrap();
        for w in 1..=4 {
            assert_eq!(vol.manual_correction()[(0, 1, w)], 1, "w = {w}");
        }
        assert!(s.is_dirty());
    }

    /// 区域选择模式下, 按下与拖动都触发区域反转.
    #[test]
    fn test_pointer_region_mode() {
        let shape = (1, 4, 4);
        let mut sp = SuperpixelGrid::zeroed(shape);
        for h in 0..4 {
            for w in 2..4 {
                sp[(0, h, w)] = 1;
            }
        }
        let mut s = AnnotationSession::with_volume(AnnotatedVolume::synthetic(
            ScanGrid::zeroed(shape),
            sp,
        ));

        s.pointer_pressed(PointerButton::Left, (0, 0));
        assert_eq!(s.volume().unwrap().sp_annotation().count(1), 8);

        // 拖进右半区, 第二个区域也被标入.
        s.pointer_moved((0, 3));
        assert_eq!(s.volume().unwrap().sp_annotation().count(1), 16);

        // 右键把左半区标出.
        s.pointer_released((0, 3));
        s.pointer_pressed(PointerButton::Right, (0, 0));
        s.pointer_released((0, 0));
        assert_eq!(s.volume().unwrap().sp_annotation().count(1), 8);
    }

    /// 模式与显示开关的默认值和翻转.
    #[test]
    fn test_mode_and_display_toggles() {
        let mut s = AnnotationSession::new();
        assert_eq!(s.mode(), EditMode::RegionSelect);
        s.toggle_mode();
        assert_eq!(s.mode(), EditMode::FreehandCorrect);

        assert!(s.display().show_annotations);
        assert!(!s.display().show_grid);
        s.toggle_grid_display();
        s.toggle_annotations_display();
        assert!(s.display().show_grid);
        assert!(!s.display().show_annotations);
    }

    /// 重置与一步撤销.
    #[test]
    fn test_reset_undo_round_trip() {
        let mut s = blank_session((2, 4, 4));
        s.toggle_mode();
        s.pointer_pressed(PointerButton::Left, (1, 1));
        s.pointer_released((1, 1));
        let painted = s.volume().unwrap().lesion_count(0);
        assert!(painted > 0);

        assert!(s.reset_slice());
        assert_eq!(s.volume().unwrap().lesion_count(0), 0);

        assert!(s.undo_reset());
        assert_eq!(s.volume().unwrap().lesion_count(0), painted);

        // 快照只有一步.
        assert!(!s.undo_reset());
    }

    /// 空会话上的编辑与保存都应安全无事.
    #[test]
    fn test_empty_session_is_inert() {
        let mut s = AnnotationSession::new();
        s.pointer_pressed(PointerButton::Left, (0, 0));
        s.pointer_released((0, 0));
        assert!(!s.reset_slice());
        assert!(!s.undo_reset());
        assert!(s.save().is_ok());
        assert!(!s.is_open());
        assert!(!s.is_dirty());
    }
}
