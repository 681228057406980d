//! 手动修正画笔: Bresenham 直线插值 + 圆盘印章.

use crate::consts::mark::*;
use crate::consts::{PEN_SIZE_DEFAULT, PEN_SIZE_MAX};
use crate::{AnnotatedVolume, Idx2dI32};

/// 手动修正笔刷的像素半径. 始终被钳制在 `0..=10` 范围内.
///
/// 半径 0 的印章恰好覆盖一个像素.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PenSize(u8);

impl Default for PenSize {
    #[inline]
    fn default() -> Self {
        Self(PEN_SIZE_DEFAULT)
    }
}

impl PenSize {
    /// 构造笔刷半径. 超过上限的输入被钳制到上限.
    #[inline]
    pub fn new(radius: u8) -> Self {
        Self(radius.min(PEN_SIZE_MAX))
    }

    /// 当前半径.
    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }

    /// 半径加一, 到上限后不再增长.
    #[inline]
    pub fn widen(&mut self) {
        if self.0 < PEN_SIZE_MAX {
            self.0 += 1;
        }
    }

    /// 半径减一, 到 0 后不再缩小.
    #[inline]
    pub fn narrow(&mut self) {
        if self.0 > 0 {
            self.0 -= 1;
        }
    }
}

/// 手动修正画笔块.
impl AnnotatedVolume {
    /// 以 `center` 为圆心盖一次圆盘印章 (笔画起点).
    ///
    /// 圆盘外延越界的部分被静默跳过; `z` 越界时整体不做任何事.
    pub fn paint_point(&mut self, z: usize, center: Idx2dI32, pen: PenSize, adding: bool) {
        if z >= self.len_z() {
            return;
        }
        self.stamp_disk(z, center, pen, adding);
        self.mark_dirty();
    }

    /// 沿 `from` 到 `to` 的直线段逐格盖圆盘印章 (笔画增量段).
    ///
    /// `from` 为当前笔画最近一次记录的点, `to` 为指针新到达的点.
    /// 直线由 Bresenham 算法栅格化, 两端点都会被盖章.
    /// 单像素的标记规则与 [`Self::paint_point`] 相同: 无状态且幂等,
    /// 因此沿途圆盘互相重叠无需去重.
    pub fn paint_to(&mut self, z: usize, from: Idx2dI32, to: Idx2dI32, pen: PenSize, adding: bool) {
        if z >= self.len_z() {
            return;
        }

        // 从新到达的点向起点回走 (历史实现的遍历方向; 两个方向盖章集合相同).
        let (mut h0, mut w0) = to;
        let (h1, w1) = from;

        let dw = (w1 - w0).abs();
        let sw = if w0 < w1 { 1 } else { -1 };
        let dh = -(h1 - h0).abs();
        let sh = if h0 < h1 { 1 } else { -1 };
        let mut err = dw + dh;

        loop {
            self.stamp_disk(z, (h0, w0), pen, adding);
            if h0 == h1 && w0 == w1 {
                break;
            }
            let err2 = 2 * err;
            if err2 >= dh {
                err += dh;
                w0 += sw;
            }
            if err2 <= dw {
                err += dw;
                h0 += sh;
            }
        }

        self.mark_dirty();
    }

    /// 以 `(ch, cw)` 为圆心、笔刷半径为半径, 标记实心圆盘内的每个像素.
    fn stamp_disk(&mut self, z: usize, (ch, cw): Idx2dI32, pen: PenSize, adding: bool) {
        let r = i32::from(pen.get());
        for dh in -r..=r {
            // 该行的半宽 = floor(sqrt(r² - dh²)).
            let half = f64::from(r * r - dh * dh).sqrt() as i32;
            for dw in -half..=half {
                self.mark_pixel(z, (ch + dh, cw + dw), adding);
            }
        }
    }

    /// 单像素标记规则. 越界像素被静默跳过.
    ///
    /// 加入模式: 区域层未覆盖时记手动加入, 已覆盖时归零 (无需覆盖).
    /// 移出模式: 区域层已覆盖时记手动移出, 未覆盖时归零.
    /// 同一模式下重复标记同一像素的结果不变.
    fn mark_pixel(&mut self, z: usize, pos: Idx2dI32, adding: bool) {
        let Some(p3) = self.sp_annotation().check_signed(z, pos) else {
            return;
        };
        let (_, sp_ann, corr) = self.split_for_edit();
        corr[p3] = if adding {
            if sp_ann[p3] == SP_NONE {
                CORR_ADDED
            } else {
                CORR_NONE
            }
        } else if sp_ann[p3] != SP_NONE {
            CORR_REMOVED
        } else {
            CORR_NONE
        };
    }
}
