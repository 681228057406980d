//! 命令到会话调用的映射.

use std::path::{Path, PathBuf};

use stir_berry::dataset;
use stir_berry::prelude::*;

/// 外壳状态: 会话本体加上目录约定需要的选择器记忆.
pub struct Shell {
    session: AnnotationSession,
    method: SegMethod,
    tier: SpTier,
    scan_file: Option<PathBuf>,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            session: AnnotationSession::new(),
            method: SegMethod::default(),
            tier: SpTier::default(),
            scan_file: None,
        }
    }

    #[inline]
    pub fn session_mut(&mut self) -> &mut AnnotationSession {
        &mut self.session
    }

    /// 按当前选择器为 `scan_file` 解析各层路径.
    fn resolve_paths(&self, scan_file: &Path) -> Result<VolumePaths, String> {
        let meta = VolumeMeta::parse_path(scan_file).map_err(|e| format!("{e:?}"))?;
        Ok(dataset::manager_volume_paths(
            scan_file, &meta, self.method, self.tier,
        ))
    }

    /// 有未保存变更时拦住破坏性操作, 返回是否放行.
    pub fn guard_dirty(&self, action: &str) -> bool {
        if self.session.is_dirty() {
            println!("Unsaved changes; `save` first, or use `{action}!` to discard them.");
            false
        } else {
            true
        }
    }

    pub fn open(&mut self, scan_file: &Path) {
        if !self.guard_dirty("close") {
            return;
        }
        match self.resolve_paths(scan_file) {
            Ok(paths) => match self.session.open(paths) {
                Ok(()) => {
                    self.scan_file = Some(scan_file.to_owned());
                    self.status();
                }
                Err(e) => println!("Cannot open volume: {e:?}"),
            },
            Err(e) => println!("Bad scan file name: {e}"),
        }
    }

    /// 选择器变更即整卷重开; 有未保存变更时要求先处理.
    fn reconfigure(&mut self) {
        let Some(scan_file) = self.scan_file.clone() else {
            return; // 尚未打开, 记住选择器即可.
        };
        match self.resolve_paths(&scan_file) {
            Ok(paths) => match self.session.reconfigure(paths) {
                Ok(()) => self.status(),
                Err(e) => println!("Cannot reload volume: {e:?}"),
            },
            Err(e) => println!("Bad scan file name: {e}"),
        }
    }

    pub fn set_method(&mut self, name: &str) {
        let Some(method) = SegMethod::from_name(name) else {
            println!("Unknown method `{name}`, expected LSC or TPS.");
            return;
        };
        if method == self.method || !self.guard_dirty("close") {
            return;
        }
        self.method = method;
        self.reconfigure();
    }

    pub fn set_tier(&mut self, name: &str) {
        let tier = match name {
            "lower" => SpTier::Lower,
            "higher" => SpTier::Higher,
            _ => {
                println!("Unknown tier `{name}`, expected lower or higher.");
                return;
            }
        };
        if tier == self.tier || !self.guard_dirty("close") {
            return;
        }
        self.tier = tier;
        self.reconfigure();
    }

    pub fn set_slice(&mut self, raw: &str) {
        match raw.parse::<usize>() {
            Ok(z) => self.session.set_slice(z),
            Err(_) => println!("Bad slice index `{raw}`."),
        }
    }

    pub fn set_pen(&mut self, raw: &str) {
        match raw.parse::<u8>() {
            Ok(r) => self.session.set_pen(r),
            Err(_) => println!("Bad pen size `{raw}`."),
        }
    }

    pub fn toggle_mode(&mut self) {
        self.session.toggle_mode();
        println!("Edit mode: {:?}", self.session.mode());
    }

    fn parse_pos(h: &str, w: &str) -> Option<Idx2dI32> {
        Some((h.parse().ok()?, w.parse().ok()?))
    }

    pub fn press(&mut self, button: &str, h: &str, w: &str) {
        let btn = match button {
            "l" => PointerButton::Left,
            "r" => PointerButton::Right,
            _ => {
                println!("Bad button `{button}`, expected l or r.");
                return;
            }
        };
        match Self::parse_pos(h, w) {
            Some(pos) => self.session.pointer_pressed(btn, pos),
            None => println!("Bad coordinates."),
        }
    }

    pub fn drag(&mut self, h: &str, w: &str) {
        match Self::parse_pos(h, w) {
            Some(pos) => self.session.pointer_moved(pos),
            None => println!("Bad coordinates."),
        }
    }

    pub fn release(&mut self, h: &str, w: &str) {
        match Self::parse_pos(h, w) {
            Some(pos) => self.session.pointer_released(pos),
            None => println!("Bad coordinates."),
        }
    }

    pub fn reset(&mut self) {
        if self.session.reset_slice() {
            println!("Slice annotations cleared (use `undo` to revert).");
        }
    }

    pub fn undo(&mut self) {
        if !self.session.undo_reset() {
            println!("Nothing to undo.");
        }
    }

    pub fn save(&mut self) {
        match self.session.save() {
            Ok(()) => println!("Annotations have been saved!"),
            Err(e) => println!("Could not save annotations, please try again: {e:?}"),
        }
    }

    pub fn close(&mut self, force: bool) {
        if !force && !self.guard_dirty("close") {
            return;
        }
        self.session.close();
        self.scan_file = None;
        println!("Volume closed.");
    }

    /// 导出当前扫描切片为灰度图.
    pub fn export(&self, out: &Path) {
        let Some(volume) = self.session.volume() else {
            println!("No volume loaded.");
            return;
        };
        match volume.scan().slice_at(self.session.slice()).save(out) {
            Ok(()) => println!("Saved {}.", out.display()),
            Err(e) => println!("Export failed: {e}"),
        }
    }

    /// 按原样导出当前手动修正切片.
    pub fn export_marks(&self, out: &Path) {
        let Some(volume) = self.session.volume() else {
            println!("No volume loaded.");
            return;
        };
        let slice = volume.manual_correction().slice_at(self.session.slice());
        match slice.save_raw(out) {
            Ok(()) => println!("Saved {}.", out.display()),
            Err(e) => println!("Export failed: {e}"),
        }
    }

    pub fn status(&self) {
        let Some(volume) = self.session.volume() else {
            println!("No volume loaded.");
            return;
        };
        let meta = volume.meta();
        let z = self.session.slice();
        let display = self.session.display();
        println!(
            "Patient {} [{}], {}x{} px, slice {}/{} ({} lesion px), {} superpixels ({:?})",
            meta.patient,
            meta.image_type,
            meta.width,
            meta.height,
            z,
            meta.slices,
            volume.lesion_count(z),
            stir_berry::naming::superpixel_count(&meta.image_type, self.tier),
            self.method,
        );
        println!(
            "mode {:?}, pen {}, grid overlay {}, annotation overlay {}, border layer {}, dirty {}",
            self.session.mode(),
            self.session.pen().get(),
            display.show_grid,
            display.show_annotations,
            if volume.border().is_some() { "loaded" } else { "unavailable" },
            self.session.is_dirty(),
        );
    }
}
