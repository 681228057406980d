//! 数据集目录操作.
//!
//! RAW 数据层的 **文件名** 规则在 [`crate::naming`] 中;
//! 本模块补充两个历史工具各自使用的 **目录** 约定,
//! 以及带分层语义的整卷打开/保存 (见 [`store`]).

use std::io;
use std::path::{Path, PathBuf};

use crate::naming::{self, SegMethod, SpTier, VolumeMeta};

mod store;

pub use store::{
    load_annotator_marks, open_volume, reopen_with_scan, save_annotations, LayerKind, LoadError,
    SaveError, VolumePaths,
};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 扫描文件所在目录约定下的数据根目录 (扫描目录的上一级).
#[inline]
fn convention_root(scan_file: &Path) -> PathBuf {
    scan_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("..")
}

/// 标注工具的目录约定: 从扫描文件出发解析一卷数据的所有层路径.
///
/// 超像素标签在 `<根>/segmentations/superpixels`, 边界旗标在
/// `<根>/segmentations/grids`, 两个标注层在 `<根>/annotations/{sp,manual}`,
/// 其中 `<根>` 为扫描目录的上一级.
pub fn manager_volume_paths(
    scan_file: &Path,
    meta: &VolumeMeta,
    method: SegMethod,
    tier: SpTier,
) -> VolumePaths {
    let root = convention_root(scan_file);
    VolumePaths {
        scan: scan_file.to_owned(),
        superpixel: root
            .join("segmentations/superpixels")
            .join(naming::superpixel_file_name(meta, method, tier)),
        border: root
            .join("segmentations/grids")
            .join(naming::border_file_name(meta, method, tier)),
        sp_annotation: root
            .join("annotations/sp")
            .join(naming::sp_annotation_file_name(meta, method, tier)),
        manual_correction: root
            .join("annotations/manual")
            .join(naming::manual_correction_file_name(meta, method, tier)),
    }
}

/// 可视化工具的目录约定下, 边界旗标层的路径:
/// `<根>/segmentations/grids/<选择器>/<文件名>`.
pub fn visualizer_border_path(
    scan_file: &Path,
    meta: &VolumeMeta,
    method: SegMethod,
    tier: SpTier,
) -> PathBuf {
    convention_root(scan_file)
        .join("segmentations/grids")
        .join(naming::selector_dir_name(&meta.image_type, method, tier))
        .join(naming::border_file_name(meta, method, tier))
}

/// 可视化工具的目录约定下, 所有标注者目录的根: `<根>/annotations`.
pub fn annotations_root(scan_file: &Path) -> PathBuf {
    convention_root(scan_file).join("annotations")
}

/// 可视化工具的目录约定下, 某标注者两个标注层的路径
/// (依次为区域标注层、手动修正层):
/// `<标注根>/<标注者>/{sp,manual}/<选择器>/<文件名>`.
pub fn annotator_mark_paths(
    annotations_root: &Path,
    annotator: &str,
    meta: &VolumeMeta,
    method: SegMethod,
    tier: SpTier,
) -> (PathBuf, PathBuf) {
    let selector = naming::selector_dir_name(&meta.image_type, method, tier);
    let base = annotations_root.join(annotator);
    (
        base.join("sp")
            .join(&selector)
            .join(naming::sp_annotation_file_name(meta, method, tier)),
        base.join("manual")
            .join(&selector)
            .join(naming::manual_correction_file_name(meta, method, tier)),
    )
}

/// 枚举标注根目录下的所有标注者子目录名, 按字典序排列.
pub fn list_annotators(annotations_root: &Path) -> io::Result<Vec<String>> {
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(annotations_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Ok(name) = entry.file_name().into_string() {
                ans.push(name);
            }
        }
    }
    ans.sort_unstable();
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> VolumeMeta {
        VolumeMeta::parse_file_name("x_SPA_4_320_288_20_2_.raw").unwrap()
    }

    /// 标注工具约定: 各层路径落在扫描目录上一级的固定子目录中.
    #[test]
    fn test_manager_layout() {
        let meta = sample_meta();
        let paths = manager_volume_paths(
            Path::new("/data/p4/stir/x_SPA_4_320_288_20_2_.raw"),
            &meta,
            SegMethod::Lsc,
            SpTier::Lower,
        );
        assert_eq!(
            paths.superpixel,
            Path::new("/data/p4/stir/../segmentations/superpixels/1000SuperPixelLSC_4_320_288_20_2_.raw"),
        );
        assert_eq!(
            paths.manual_correction,
            Path::new("/data/p4/stir/../annotations/manual/1000manualAnnotationsLSC_4_320_288_20_1_.raw"),
        );
    }

    /// 可视化工具约定: 标注层位于带选择器子目录的标注者目录下.
    #[test]
    fn test_visualizer_layout() {
        let meta = sample_meta();
        let root = annotations_root(Path::new("/data/p4/stir/x_SPA_4_320_288_20_2_.raw"));
        assert_eq!(root, Path::new("/data/p4/stir/../annotations"));

        let (sp, manual) =
            annotator_mark_paths(&root, "rater1", &meta, SegMethod::Tps, SpTier::Higher);
        assert_eq!(
            sp,
            root.join("rater1/sp/SPA2000TPS/2000spAnnotationsTPS_4_320_288_20_1_.raw"),
        );
        assert_eq!(
            manual,
            root.join("rater1/manual/SPA2000TPS/2000manualAnnotationsTPS_4_320_288_20_1_.raw"),
        );
    }
}
