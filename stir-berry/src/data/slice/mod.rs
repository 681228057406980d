//! 体数据水平切片视图的操作.

mod core;
mod mirror;
mod save;

pub use core::{GridSlice, GridSliceMut, OwnedGridSlice};

pub use mirror::{CompactMarkSlice, MarkMirror};

pub use save::{ImgWriteRaw, ImgWriteVis};
