//! 切片的持久化图像存储.

use image::ImageResult;
use std::path::Path;

use super::{GridSlice, GridSliceMut};

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// `ImgWriteVis` trait 的意图是, 图像将以 "可视化友好"
/// 的方式保存, 而不是 "as is" 的方式. 这意味着, 对于以 16 位强度值存储的扫描切片,
/// 在保存时会按切片最大值重缩放到满量程再折算为 8 位灰度;
/// 对于一致度图, 在保存时会把同意人数映射为灰度等级.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// `ImgWriteRaw` trait 的额外意图是, 图像将按原样保存. 对于标注层切片,
/// 这意味着像素按补码直接转为无符号字节 (-1 会存为 255).
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

macro_rules! impl_scan_vis {
    ($($slice: ty),+) => {
        $(
            /// 按切片最大强度重缩放后保存为 8 位灰度图.
            impl ImgWriteVis for $slice {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    // 与体数据级重缩放同款的截断整数商.
                    let max = self.iter().copied().max().unwrap_or(0).max(1);
                    let factor = u32::from(u16::MAX) / u32::from(max);
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &v) in self.indexed_iter() {
                        let gray = ((factor * u32::from(v)) >> 8) as u8;
                        buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

macro_rules! impl_mark_raw {
    ($($slice: ty),+) => {
        $(
            /// 按原样存储.
            impl ImgWriteRaw for $slice {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, image::Luma([pix as u8]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

impl_scan_vis!(GridSlice<'_, u16>, GridSliceMut<'_, u16>);
impl_mark_raw!(GridSlice<'_, i8>, GridSliceMut<'_, i8>);
