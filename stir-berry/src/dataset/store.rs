//! 体数据的分层打开与保存.

use std::io;
use std::path::{Path, PathBuf};

use crate::aggregate::AnnotatorMarks;
use crate::codec::{self, RawReadError};
use crate::naming::{ParseNameError, VolumeMeta};
use crate::{AnnotatedVolume, BorderGrid, Idx3d, MarkGrid, ScanGrid, SuperpixelGrid};

/// 一卷数据在某个 (分割方法, 超像素档位) 选择器下的所有层文件路径.
///
/// 目录约定由调用方决定 (见 [`super::manager_volume_paths`] 等);
/// 本结构只携带解析完成的结果.
#[derive(Debug, Clone)]
pub struct VolumePaths {
    /// 扫描强度层.
    pub scan: PathBuf,

    /// 超像素标签层.
    pub superpixel: PathBuf,

    /// 超像素边界旗标层 (可选层).
    pub border: PathBuf,

    /// 区域标注层.
    pub sp_annotation: PathBuf,

    /// 手动修正层.
    pub manual_correction: PathBuf,
}

/// 数据层种类, 用于错误报告.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LayerKind {
    /// 扫描强度层.
    Scan,

    /// 超像素标签层.
    Superpixel,

    /// 超像素边界旗标层.
    Border,

    /// 区域标注层.
    SpAnnotation,

    /// 手动修正层.
    ManualCorrection,
}

/// 打开体数据错误. 任一致命错误都不会留下半成品体数据.
#[derive(Debug)]
pub enum LoadError {
    /// 扫描文件名无法解析出元信息.
    Name(ParseNameError),

    /// 强制层读取失败 (文件缺失、不可读或被截断).
    Layer {
        /// 出错的层.
        layer: LayerKind,

        /// 底层原因.
        source: RawReadError,
    },

    /// 次级层的字节数与体数据声明的形状不一致.
    DimensionMismatch {
        /// 出错的层.
        layer: LayerKind,

        /// 声明形状所需的字节数.
        expected: usize,

        /// 实际拿到的字节数.
        actual: usize,
    },
}

/// 保存标注错误. 保存失败时变更标记保持置位, 工作不会被静默丢弃.
#[derive(Debug)]
pub enum SaveError {
    /// 某标注层写入失败.
    Io {
        /// 出错的层.
        layer: LayerKind,

        /// 底层原因.
        source: io::Error,
    },
}

/// 次级层错误映射: 字节数不足视作形状不一致, 其余维持层错误.
fn secondary_err(layer: LayerKind, e: RawReadError) -> LoadError {
    match e {
        RawReadError::Undersized { expected, actual } => LoadError::DimensionMismatch {
            layer,
            expected,
            actual,
        },
        other => LoadError::Layer {
            layer,
            source: other,
        },
    }
}

/// 读取一个标注层. 文件尚不存在时以零初始化 (首次保存时才会落盘).
fn read_mark_layer(path: &Path, shape: Idx3d, layer: LayerKind) -> Result<MarkGrid, LoadError> {
    match codec::read_mark_grid(path, shape) {
        Ok(g) => Ok(g),
        Err(e) if e.is_not_found() => Ok(MarkGrid::zeroed(shape)),
        Err(e) => Err(secondary_err(layer, e)),
    }
}

/// 读取可选的边界旗标层. 文件缺失时该特性不可用, 但体数据仍可打开.
fn read_border_layer(path: &Path, shape: Idx3d) -> Result<Option<BorderGrid>, LoadError> {
    match codec::read_flag_grid(path, shape) {
        Ok(g) => Ok(Some(g)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(secondary_err(LayerKind::Border, e)),
    }
}

/// 读取超像素标签层与其余各层, 与给定的扫描层组装为体数据.
fn assemble(
    scan: ScanGrid,
    meta: VolumeMeta,
    paths: &VolumePaths,
) -> Result<AnnotatedVolume, LoadError> {
    let shape = scan.shape();

    let superpixel: SuperpixelGrid = codec::read_u16_grid(&paths.superpixel, shape)
        .map_err(|e| secondary_err(LayerKind::Superpixel, e))?;
    let border = read_border_layer(&paths.border, shape)?;
    let sp_annotation = read_mark_layer(&paths.sp_annotation, shape, LayerKind::SpAnnotation)?;
    let manual_correction =
        read_mark_layer(&paths.manual_correction, shape, LayerKind::ManualCorrection)?;

    Ok(AnnotatedVolume::new(
        meta,
        scan,
        superpixel,
        border,
        sp_annotation,
        manual_correction,
    ))
}

/// 打开一卷体数据.
///
/// 形状取自扫描文件名; 扫描层与超像素层是强制层, 任一读取失败都使
/// 本次打开整体失败. 扫描强度在这里被一次性重缩放到满量程.
pub fn open_volume(paths: &VolumePaths) -> Result<AnnotatedVolume, LoadError> {
    let meta = VolumeMeta::parse_path(&paths.scan).map_err(LoadError::Name)?;
    let mut scan = codec::read_u16_grid(&paths.scan, meta.shape()).map_err(|source| {
        LoadError::Layer {
            layer: LayerKind::Scan,
            source,
        }
    })?;
    scan.rescale_to_full_range();

    assemble(scan, meta, paths)
}

/// 以新的选择器路径重新组装体数据, 复用已加载的扫描层及其形状.
///
/// 这是 "分割方法/超像素档位变更即整卷重开" 约定的加载端:
/// 超像素、边界与标注各层按新路径全部重读, 扫描层原样保留.
pub fn reopen_with_scan(
    scan: ScanGrid,
    meta: VolumeMeta,
    paths: &VolumePaths,
) -> Result<AnnotatedVolume, LoadError> {
    assemble(scan, meta, paths)
}

/// 保存两个标注层.
///
/// 两个文件都成功写入后才清除体数据的变更标记;
/// 任一写入失败都保持标记置位并报告错误.
pub fn save_annotations(
    volume: &mut AnnotatedVolume,
    paths: &VolumePaths,
) -> Result<(), SaveError> {
    codec::write_mark_grid(&paths.sp_annotation, volume.sp_annotation()).map_err(|source| {
        SaveError::Io {
            layer: LayerKind::SpAnnotation,
            source,
        }
    })?;
    codec::write_mark_grid(&paths.manual_correction, volume.manual_correction()).map_err(
        |source| SaveError::Io {
            layer: LayerKind::ManualCorrection,
            source,
        },
    )?;
    volume.clear_dirty();
    Ok(())
}

/// 读取一个标注者的两个标注层, 供一致度聚合使用.
///
/// 与打开体数据不同, 这里的两个层都是强制层:
/// 读不到就让调用方跳过该标注者.
pub fn load_annotator_marks(
    name: &str,
    sp_path: &Path,
    manual_path: &Path,
    shape: Idx3d,
) -> Result<AnnotatorMarks, LoadError> {
    let sp = codec::read_mark_grid(sp_path, shape)
        .map_err(|e| secondary_err(LayerKind::SpAnnotation, e))?;
    let manual = codec::read_mark_grid(manual_path, shape)
        .map_err(|e| secondary_err(LayerKind::ManualCorrection, e))?;

    // 两层都按同一形状解码, 该操作不会生成 `Err`, 可直接 unwrap.
    Ok(AnnotatorMarks::new(name.to_string(), sp, manual).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCAN_NAME: &str = "x_SPA_1_2_2_2_2_.raw";

    /// 以 `tag` 为区分创建独立的测试目录, 并铺好一卷 2×2×2 的数据:
    /// 扫描 (最大样本 256)、超像素 (左右两列不同标签)、边界层.
    fn setup(tag: &str) -> (PathBuf, VolumePaths) {
        let dir = std::env::temp_dir().join(format!("stir-berry-store-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let paths = VolumePaths {
            scan: dir.join(SCAN_NAME),
            superpixel: dir.join("sp.raw"),
            border: dir.join("border.raw"),
            sp_annotation: dir.join("sp_ann.raw"),
            manual_correction: dir.join("manual.raw"),
        };

        // 8 个 u16 样本, 最大值 256.
        let scan_bytes = [
            0, 0, 0, 1, 0, 2, 0, 3, //
            0, 4, 0, 5, 0, 6, 1, 0,
        ];
        fs::write(&paths.scan, scan_bytes).unwrap();

        // 标签: 每切片左列 0, 右列 7.
        let sp_bytes = [
            0, 0, 0, 7, 0, 0, 0, 7, //
            0, 0, 0, 7, 0, 0, 0, 7,
        ];
        fs::write(&paths.superpixel, sp_bytes).unwrap();

        let border_bytes = [0u8; 16];
        fs::write(&paths.border, border_bytes).unwrap();

        (dir, paths)
    }

    /// 完整打开: 重缩放、可选层、零初始化的标注层.
    #[test]
    fn test_open_volume_full() {
        let (_dir, paths) = setup("open");
        let vol = open_volume(&paths).unwrap();

        assert_eq!(vol.shape(), (2, 2, 2));
        assert_eq!(vol.meta().image_type, "SPA");
        // max = 256, 系数 = 65535 / 256 = 255.
        assert_eq!(vol.scan()[(0, 0, 1)], 255);
        assert_eq!(vol.scan()[(1, 1, 1)], 255 * 256);

        assert_eq!(vol.superpixel()[(0, 0, 1)], 7);
        assert!(vol.border().is_some());
        assert_eq!(vol.sp_annotation().count(0), 8);
        assert!(!vol.dirty());
    }

    /// 边界层缺失: 特性不可用, 体数据照常打开.
    #[test]
    fn test_open_without_border() {
        let (_dir, paths) = setup("noborder");
        fs::remove_file(&paths.border).unwrap();
        let vol = open_volume(&paths).unwrap();
        assert!(vol.border().is_none());
    }

    /// 强制层缺失: 打开整体失败.
    #[test]
    fn test_open_missing_superpixel() {
        let (_dir, paths) = setup("nosp");
        fs::remove_file(&paths.superpixel).unwrap();
        match open_volume(&paths) {
            Err(LoadError::Layer {
                layer: LayerKind::Superpixel,
                source,
            }) => assert!(source.is_not_found()),
            other => panic!("意外结果: {other:?}"),
        }
    }

    /// 次级层被截断: 报形状不一致.
    #[test]
    fn test_open_truncated_superpixel() {
        let (_dir, paths) = setup("shortsp");
        fs::write(&paths.superpixel, [0u8; 15]).unwrap();
        assert!(matches!(
            open_volume(&paths),
            Err(LoadError::DimensionMismatch {
                layer: LayerKind::Superpixel,
                expected: 16,
                actual: 15,
            }),
        ));
    }

    /// 编辑-保存-重开的完整生命周期: 变更标记清除, 标注落盘可回读.
    #[test]
    fn test_save_and_reload() {
        let (_dir, paths) = setup("save");
        let mut vol = open_volume(&paths).unwrap();

        vol.toggle_region(0, (0, 0), true); // 左列整体标入.
        assert!(vol.dirty());

        save_annotations(&mut vol, &paths).unwrap();
        assert!(!vol.dirty());

        let reloaded = open_volume(&paths).unwrap();
        assert_eq!(reloaded.sp_annotation()[(0, 0, 0)], 1);
        assert_eq!(reloaded.sp_annotation()[(0, 1, 0)], 1);
        assert_eq!(reloaded.sp_annotation().count(1), 2);
    }

    /// 保存到不可写路径: 报错且变更标记保持置位.
    #[test]
    fn test_save_failure_keeps_dirty() {
        let (dir, mut paths) = setup("savefail");
        let mut vol = open_volume(&paths).unwrap();
        vol.toggle_region(0, (0, 0), true);

        paths.sp_annotation = dir.join("no/such/dir/ann.raw");
        assert!(matches!(
            save_annotations(&mut vol, &paths),
            Err(SaveError::Io {
                layer: LayerKind::SpAnnotation,
                ..
            }),
        ));
        assert!(vol.dirty());
    }

    /// 重配置加载端: 扫描层复用, 其余层按新路径重读.
    #[test]
    fn test_reopen_with_scan() {
        let (dir, paths) = setup("reopen");
        let vol = open_volume(&paths).unwrap();
        let scan_before = vol.scan().clone();
        let (meta, scan) = vol.into_meta_scan();

        let mut alt = paths.clone();
        alt.superpixel = dir.join("sp_alt.raw");
        // 换一套标签: 全 0.
        fs::write(&alt.superpixel, [0u8; 16]).unwrap();

        let vol = reopen_with_scan(scan, meta, &alt).unwrap();
        assert_eq!(vol.superpixel().count(7), 0);
        assert_eq!(vol.scan().data(), scan_before.data());
    }

    /// 标注者数据加载: 缺失即报错, 由调用方决定跳过.
    #[test]
    fn test_load_annotator_marks() {
        let (dir, paths) = setup("rater");
        fs::write(&paths.sp_annotation, [0u8, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        fs::write(&paths.manual_correction, [0u8; 8]).unwrap();

        let marks =
            load_annotator_marks("rater1", &paths.sp_annotation, &paths.manual_correction, (2, 2, 2))
                .unwrap();
        assert_eq!(marks.name(), "rater1");

        let missing = dir.join("missing.raw");
        assert!(matches!(
            load_annotator_marks("rater2", &missing, &paths.manual_correction, (2, 2, 2)),
            Err(LoadError::Layer { .. }),
        ));
    }

    /// 扫描文件名不合法: 报名称解析错误.
    #[test]
    fn test_open_bad_name() {
        let (dir, mut paths) = setup("badname");
        let bad = dir.join("bad.raw");
        fs::copy(&paths.scan, &bad).unwrap();
        paths.scan = bad;
        assert!(matches!(open_volume(&paths), Err(LoadError::Name(_))));
    }
}
