//! 标注编辑算法: 超像素区域反转与手动修正画笔.

use std::collections::VecDeque;

use crate::consts::mark::*;
use crate::data::MarkMirror;
use crate::{AnnotatedVolume, Idx2d, Idx2dI32};

mod brush;

pub use brush::PenSize;

/// 获得以 `(h, w)` 为中心的 3×3 块 (含自身) 的索引. 不检查越界.
#[inline]
pub(crate) fn neighbour9((h, w): Idx2d) -> [Idx2d; 9] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 超像素区域级编辑块.
impl AnnotatedVolume {
    /// 对第 `z` 切片上 `seed` 所在的超像素区域做整体标注反转.
    ///
    /// 区域由 8-邻域 BFS 界定: 两个像素属于同一区域当且仅当存在一条
    /// 8-相邻路径, 路径上所有像素的超像素标签都与 `seed` 处相等.
    /// `adding` 为真时把区域整体标入病灶, 否则整体标出.
    ///
    /// 入队以区域标注值的实际变化为门槛, 因此该操作幂等、必然终止,
    /// 且每个像素至多被修改一次. 已经冗余的手动修正
    /// (标入时的 `+1`, 标出时的 `-1`) 会被顺带归零.
    ///
    /// `seed` 取负或越界时静默跳过, 不产生任何变更.
    /// 操作不会跨越切片边界.
    pub fn toggle_region(&mut self, z: usize, seed: Idx2dI32, adding: bool) {
        let Some((_, sh, sw)) = self.superpixel().check_signed(z, seed) else {
            return;
        };

        let (superpixel, sp_ann, corr) = self.split_for_edit();
        let target = superpixel[(z, sh, sw)];

        let mut queue: VecDeque<Idx2d> = VecDeque::with_capacity(4);
        queue.push_back((sh, sw));

        while let Some(cur) = queue.pop_front() {
            for (nh, nw) in neighbour9(cur) {
                let pos = (z, nh, nw);
                if !superpixel.check(&pos) || superpixel[pos] != target {
                    continue;
                }
                if adding {
                    if sp_ann[pos] == SP_NONE {
                        sp_ann[pos] = SP_LESION;
                        queue.push_back((nh, nw));
                        if corr[pos] == CORR_ADDED {
                            // 区域整体已标入, 原先的手动加入冗余.
                            corr[pos] = CORR_NONE;
                        }
                    }
                } else if sp_ann[pos] != SP_NONE {
                    sp_ann[pos] = SP_NONE;
                    queue.push_back((nh, nw));
                    if corr[pos] == CORR_REMOVED {
                        // 区域整体已标出, 原先的手动移出冗余.
                        corr[pos] = CORR_NONE;
                    }
                }
            }
        }

        self.mark_dirty();
    }

    /// 将第 `z` 切片的两个标注层全部归零.
    ///
    /// 归零前的内容可先用切片视图的 `mirror`/`compress` 自行留存.
    /// 当 `z` 越界时 panic.
    pub fn reset_slice(&mut self, z: usize) {
        {
            let (mut sp, mut corr) = self.layers_at_mut(z);
            sp.fill(SP_NONE);
            corr.fill(CORR_NONE);
        }
        self.mark_dirty();
    }

    /// 用镜像恢复第 `z` 切片的两个标注层.
    ///
    /// 当 `z` 越界或镜像大小不符时 panic.
    pub fn restore_slice(&mut self, z: usize, sp: &MarkMirror, corr: &MarkMirror) {
        {
            let (mut sp_slice, mut corr_slice) = self.layers_at_mut(z);
            sp_slice.resume(sp);
            corr_slice.resume(corr);
        }
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use crate::{AnnotatedVolume, Idx3d, PenSize, ScanGrid, SuperpixelGrid};

    /// 构造 2 切片、高 4、宽 4 的体数据, 每个切片左半 (宽 < 2) 标签 0,
    /// 右半标签 1.
    fn two_half_volume() -> AnnotatedVolume {
        let shape: Idx3d = (2, 4, 4);
        let mut sp = SuperpixelGrid::zeroed(shape);
        for z in 0..2 {
            for h in 0..4 {
                for w in 2..4 {
                    sp[(z, h, w)] = 1;
                }
            }
        }
        AnnotatedVolume::synthetic(ScanGrid::zeroed(shape), sp)
    }

    /// 种子区域整体标入: 只动本切片上同标签的 8 个像素.
    #[test]
    fn test_fill_left_half_only() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (0, 0), true);

        for h in 0..4 {
            for w in 0..4 {
                let expected = i8::from(w < 2);
                assert_eq!(vol.sp_annotation()[(0, h, w)], expected, "({h}, {w})");
                assert_eq!(vol.sp_annotation()[(1, h, w)], 0, "切片 1 不应被波及");
            }
        }
        assert!(vol.dirty());
    }

    /// 幂等性: 连续两次标入与一次标入结果相同.
    #[test]
    fn test_fill_idempotent() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (0, 0), true);
        let once = vol.sp_annotation().data().to_owned();
        vol.toggle_region(0, (0, 0), true);
        assert_eq!(vol.sp_annotation().data(), once);
    }

    /// 互补性: 标入后立即标出, 区域标注层还原.
    #[test]
    fn test_fill_complementary() {
        let mut vol = two_half_volume();
        let before = vol.sp_annotation().data().to_owned();
        vol.toggle_region(0, (1, 1), true);
        vol.toggle_region(0, (1, 1), false);
        assert_eq!(vol.sp_annotation().data(), before);
    }

    /// 越界种子静默跳过: 不变更、不置脏、不崩溃.
    #[test]
    fn test_fill_out_of_bounds_seed() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (-1, 0), true);
        vol.toggle_region(0, (0, 4), true);
        vol.toggle_region(2, (0, 0), true);
        assert_eq!(vol.sp_annotation().count(1), 0);
        assert!(!vol.dirty());
    }

    /// 跨层消解: 手动加入的像素在区域整体标入后归零.
    #[test]
    fn test_fill_cancels_redundant_manual_add() {
        let mut vol = two_half_volume();
        vol.paint_point(0, (0, 0), PenSize::new(0), true);
        assert_eq!(vol.manual_correction()[(0, 0, 0)], 1);

        vol.toggle_region(0, (0, 0), true);
        assert_eq!(vol.sp_annotation()[(0, 0, 0)], 1);
        assert_eq!(vol.manual_correction()[(0, 0, 0)], 0);
    }

    /// 跨层消解 (对称情形): 手动移出的像素在区域整体标出后归零.
    #[test]
    fn test_unfill_cancels_redundant_manual_remove() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (0, 0), true);
        vol.paint_point(0, (2, 1), PenSize::new(0), false);
        assert_eq!(vol.manual_correction()[(0, 2, 1)], -1);

        vol.toggle_region(0, (0, 0), false);
        assert_eq!(vol.sp_annotation()[(0, 2, 1)], 0);
        assert_eq!(vol.manual_correction()[(0, 2, 1)], 0);
    }

    /// 区域标出只影响已标入的像素, 且不触碰其它标签的区域.
    #[test]
    fn test_unfill_respects_labels() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (0, 0), true);
        vol.toggle_region(0, (0, 3), true);
        assert_eq!(vol.sp_annotation().count(1), 16);

        vol.toggle_region(0, (0, 0), false);
        for h in 0..4 {
            for w in 0..4 {
                let expected = i8::from(w >= 2);
                assert_eq!(vol.sp_annotation()[(0, h, w)], expected, "({h}, {w})");
            }
        }
    }

    /// 重置与镜像恢复的完整往返.
    #[test]
    fn test_reset_and_restore() {
        let mut vol = two_half_volume();
        vol.toggle_region(0, (0, 0), true);
        vol.paint_point(0, (0, 3), PenSize::new(0), true);
        assert_eq!(vol.lesion_count(0), 9);

        let sp = vol.sp_annotation().slice_at(0).mirror();
        let corr = vol.manual_correction().slice_at(0).mirror();

        vol.reset_slice(0);
        assert_eq!(vol.lesion_count(0), 0);

        vol.restore_slice(0, &sp, &corr);
        assert_eq!(vol.lesion_count(0), 9);
    }
}
