//! 文件名约定.
//!
//! 所有 RAW 文件都把体数据形状编码在下划线分隔的文件名里, 字段从尾部倒数:
//! `[..., 扫描族, 病人号, 宽, 高, 切片数, _, _]`.
//! 周边目录结构 (分割方法/超像素档位子目录) 由调用方负责,
//! 见 [`crate::dataset`].

use std::path::Path;

use crate::consts::*;
use crate::Idx3d;

/// 文件名解析错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNameError {
    /// 文件名不是合法 UTF-8, 或路径没有文件名部分.
    NoFileName,

    /// 下划线分隔的字段不足 7 个.
    TooFewFields(usize),

    /// 数值字段无法解析.
    BadNumber {
        /// 字段含义.
        field: &'static str,

        /// 原始文本.
        value: String,
    },
}

/// 从文件名解析出的体数据元信息.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMeta {
    /// 扫描族标签, 如 `SPA`. 不同扫描族有不同的默认超像素档位.
    pub image_type: String,

    /// 病人号.
    pub patient: u32,

    /// 切片宽度 (像素).
    pub width: usize,

    /// 切片高度 (像素).
    pub height: usize,

    /// 切片个数.
    pub slices: usize,
}

impl VolumeMeta {
    /// 从文件基础名 (含扩展名) 解析元信息. 字段从尾部倒数, 因此允许
    /// 文件名头部携带任意多的附加字段.
    pub fn parse_file_name(name: &str) -> Result<Self, ParseNameError> {
        let fields: Vec<&str> = name.split('_').collect();
        if fields.len() < 7 {
            return Err(ParseNameError::TooFewFields(fields.len()));
        }

        let nth_last = |i: usize| fields[fields.len() - i];
        let number = |field: &'static str, raw: &str| {
            raw.parse::<usize>().map_err(|_| ParseNameError::BadNumber {
                field,
                value: raw.to_string(),
            })
        };

        Ok(Self {
            image_type: nth_last(7).to_string(),
            patient: number("病人号", nth_last(6))? as u32,
            width: number("宽", nth_last(5))?,
            height: number("高", nth_last(4))?,
            slices: number("切片数", nth_last(3))?,
        })
    }

    /// 从文件路径解析元信息.
    pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseNameError> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ParseNameError::NoFileName)?;
        Self::parse_file_name(name)
    }

    /// 以形状信息伪造元信息, 仅供实验实体使用.
    pub(crate) fn synthetic((z, h, w): Idx3d) -> Self {
        Self {
            image_type: "fake".to_string(),
            patient: 0,
            width: w,
            height: h,
            slices: z,
        }
    }

    /// 该元信息声明的体数据形状 `(切片数, 高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        (self.slices, self.height, self.width)
    }
}

/// 超像素分割方法.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SegMethod {
    /// Linear Spectral Clustering.
    #[default]
    Lsc,

    /// Turbopixels.
    Tps,
}

impl SegMethod {
    /// 文件名中使用的方法标签.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lsc => "LSC",
            Self::Tps => "TPS",
        }
    }

    /// 由方法标签还原枚举值. 未知标签返回 `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LSC" => Some(Self::Lsc),
            "TPS" => Some(Self::Tps),
            _ => None,
        }
    }
}

/// 超像素个数档位. 档位对应的具体个数取决于扫描族, 见 [`superpixel_count`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SpTier {
    /// 较少超像素 (更大的区域).
    #[default]
    Lower,

    /// 较多超像素 (更小的区域).
    Higher,
}

/// 给定扫描族与档位下的超像素个数.
///
/// `SPA` 扫描族使用 1000/2000, 其它扫描族使用 250/500.
#[inline]
pub fn superpixel_count(image_type: &str, tier: SpTier) -> u32 {
    match (image_type == "SPA", tier) {
        (true, SpTier::Lower) => SP_COUNT_SPA_LOWER,
        (true, SpTier::Higher) => SP_COUNT_SPA_HIGHER,
        (false, SpTier::Lower) => SP_COUNT_DEFAULT_LOWER,
        (false, SpTier::Higher) => SP_COUNT_DEFAULT_HIGHER,
    }
}

/// 各数据层文件名的统一构造.
#[inline]
fn layer_file_name(
    kind: &str,
    meta: &VolumeMeta,
    method: SegMethod,
    tier: SpTier,
    trailing: u8,
) -> String {
    let n = superpixel_count(&meta.image_type, tier);
    let VolumeMeta {
        patient,
        width,
        height,
        slices,
        ..
    } = meta;
    format!(
        "{n}{kind}{}_{patient}_{width}_{height}_{slices}_{trailing}_.raw",
        method.as_str()
    )
}

/// 超像素标签层的文件名.
#[inline]
pub fn superpixel_file_name(meta: &VolumeMeta, method: SegMethod, tier: SpTier) -> String {
    layer_file_name("SuperPixel", meta, method, tier, 2)
}

/// 超像素边界旗标层的文件名.
#[inline]
pub fn border_file_name(meta: &VolumeMeta, method: SegMethod, tier: SpTier) -> String {
    layer_file_name("BorderSuperPixel", meta, method, tier, 2)
}

/// 区域标注层的文件名.
#[inline]
pub fn sp_annotation_file_name(meta: &VolumeMeta, method: SegMethod, tier: SpTier) -> String {
    layer_file_name("spAnnotations", meta, method, tier, 1)
}

/// 手动修正层的文件名.
#[inline]
pub fn manual_correction_file_name(meta: &VolumeMeta, method: SegMethod, tier: SpTier) -> String {
    layer_file_name("manualAnnotations", meta, method, tier, 1)
}

/// 可视化工具布局使用的选择器子目录名, 形如 `SPA1000LSC`.
#[inline]
pub fn selector_dir_name(image_type: &str, method: SegMethod, tier: SpTier) -> String {
    format!(
        "{image_type}{}{}",
        superpixel_count(image_type, tier),
        method.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 字段从尾部倒数, 头部附加字段不影响解析.
    #[test]
    fn test_parse_from_end() {
        let meta = VolumeMeta::parse_file_name("study7_extra_SPA_12_320_288_25_2_.raw").unwrap();
        assert_eq!(meta.image_type, "SPA");
        assert_eq!(meta.patient, 12);
        assert_eq!(meta.width, 320);
        assert_eq!(meta.height, 288);
        assert_eq!(meta.slices, 25);
        assert_eq!(meta.shape(), (25, 288, 320));
    }

    /// 字段不足与非数值字段的错误报告.
    #[test]
    fn test_parse_errors() {
        assert_eq!(
            VolumeMeta::parse_file_name("a_b_c.raw"),
            Err(ParseNameError::TooFewFields(3)),
        );
        assert!(matches!(
            VolumeMeta::parse_file_name("x_SPA_12_wide_288_25_2_.raw"),
            Err(ParseNameError::BadNumber { field: "宽", .. }),
        ));
    }

    /// 档位表: SPA 用 1000/2000, 其它扫描族用 250/500.
    #[test]
    fn test_superpixel_count_table() {
        assert_eq!(superpixel_count("SPA", SpTier::Lower), 1000);
        assert_eq!(superpixel_count("SPA", SpTier::Higher), 2000);
        assert_eq!(superpixel_count("DIXON", SpTier::Lower), 250);
        assert_eq!(superpixel_count("DIXON", SpTier::Higher), 500);
    }

    /// 各层文件名与历史数据逐字符一致.
    #[test]
    fn test_layer_file_names() {
        let meta = VolumeMeta::parse_file_name("x_SPA_4_320_288_20_2_.raw").unwrap();
        assert_eq!(
            superpixel_file_name(&meta, SegMethod::Lsc, SpTier::Lower),
            "1000SuperPixelLSC_4_320_288_20_2_.raw",
        );
        assert_eq!(
            border_file_name(&meta, SegMethod::Tps, SpTier::Higher),
            "2000BorderSuperPixelTPS_4_320_288_20_2_.raw",
        );
        assert_eq!(
            sp_annotation_file_name(&meta, SegMethod::Lsc, SpTier::Lower),
            "1000spAnnotationsLSC_4_320_288_20_1_.raw",
        );
        assert_eq!(
            manual_correction_file_name(&meta, SegMethod::Lsc, SpTier::Lower),
            "1000manualAnnotationsLSC_4_320_288_20_1_.raw",
        );
        assert_eq!(
            selector_dir_name("SPA", SegMethod::Lsc, SpTier::Higher),
            "SPA2000LSC",
        );
    }
}
