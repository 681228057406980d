//! 通用常量.

/// 标注层取值.
pub mod mark {
    /// 区域标注层中, "不属于病灶" 的取值.
    pub const SP_NONE: i8 = 0;

    /// 区域标注层中, "经超像素区域标注为病灶" 的取值.
    pub const SP_LESION: i8 = 1;

    /// 手动修正层中, "无覆盖" 的取值.
    pub const CORR_NONE: i8 = 0;

    /// 手动修正层中, "无视区域状态, 手动加入病灶" 的取值.
    pub const CORR_ADDED: i8 = 1;

    /// 手动修正层中, "无视区域状态, 手动移出病灶" 的取值.
    pub const CORR_REMOVED: i8 = -1;

    /// 区域标注值是否代表病灶?
    #[inline]
    pub const fn is_sp_lesion(p: i8) -> bool {
        matches!(p, SP_LESION)
    }

    /// 手动修正值是否代表手动加入?
    #[inline]
    pub const fn is_corr_added(p: i8) -> bool {
        matches!(p, CORR_ADDED)
    }

    /// 手动修正值是否代表手动移出?
    #[inline]
    pub const fn is_corr_removed(p: i8) -> bool {
        matches!(p, CORR_REMOVED)
    }

    /// 两层叠加后该像素是否呈现为病灶?
    ///
    /// 叠加规则为 `sp + corr > 0`.
    #[inline]
    pub const fn is_effective(sp: i8, corr: i8) -> bool {
        sp + corr > 0
    }
}

/// 手动修正笔刷的最大像素半径.
pub const PEN_SIZE_MAX: u8 = 10;

/// 手动修正笔刷的默认像素半径.
pub const PEN_SIZE_DEFAULT: u8 = 3;

/// SPA 扫描族在 "较少超像素" 档位下的超像素个数.
pub const SP_COUNT_SPA_LOWER: u32 = 1000;

/// SPA 扫描族在 "较多超像素" 档位下的超像素个数.
pub const SP_COUNT_SPA_HIGHER: u32 = 2000;

/// 其它扫描族在 "较少超像素" 档位下的超像素个数.
pub const SP_COUNT_DEFAULT_LOWER: u32 = 250;

/// 其它扫描族在 "较多超像素" 档位下的超像素个数.
pub const SP_COUNT_DEFAULT_HIGHER: u32 = 500;

/// 扫描样本重缩放的目标满量程值.
pub const INTENSITY_FULL_SCALE: u16 = u16::MAX;
