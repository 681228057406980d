#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 STIR MRI 病灶标注工程中各 RAW 数据层的结构化信息和基础编辑算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 按照本工程既有的 RAW 文件布局 (无文件头, 形状编码在文件名里)
//!   组织数据, 没有对其它格式的数据做直接适配.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 功能总览
//!
//! ### 体数据网格 ✅
//!
//! 固定形状的三维网格 [`VolumeGrid`] 与其借用的二维水平切片视图,
//! 以及由五个数据层组合而成的 [`AnnotatedVolume`].
//!
//! 实现位于 `stir-berry/src/data`.
//!
//! ### RAW 字节编解码 ✅
//!
//! 16 位大端样本、带符号单字节样本、16 位布尔样本三种编码的无文件头编解码.
//!
//! 实现位于 `stir-berry/src/codec.rs`.
//!
//! ### 超像素区域反转标注 ✅
//!
//! 以超像素标签为等价类, 在 8-邻域上做 BFS 的区域级病灶标注添加/移除,
//! 并对跨层冗余的手动修正做归零消解.
//!
//! 实现位于 `stir-berry/src/annotate`.
//!
//! ### 手动修正画笔 ✅
//!
//! Bresenham 直线插值 + 圆盘印章的自由手绘修正层编辑.
//!
//! 实现位于 `stir-berry/src/annotate/brush.rs`.
//!
//! ### 多标注者一致度聚合 ✅
//!
//! 只读地将 N 个标注者的标注层按像素归并为同意人数, 供可视化热度展示.
//!
//! 实现位于 `stir-berry/src/aggregate.rs`.
//!
//! ### 文件名约定与分层加载/保存 ✅
//!
//! 下划线分隔的文件名字段解析, 各数据层文件名构造,
//! 以及带可选层语义的整卷打开/保存.
//!
//! 实现位于 `stir-berry/src/naming.rs` 和 `stir-berry/src/dataset`.
//!
//! ### 编辑会话 ✅
//!
//! 指针事件状态机、编辑模式、笔刷尺寸与显示选项等会话状态,
//! 连同打开/保存/重配置的完整生命周期.
//!
//! 实现位于 `stir-berry/src/session.rs`.
//!
//! ### 小功能 ✅
//!
//! 1. 提供 mark mirror 以支持标注切片的备份与恢复. ✅
//! 2. zlib 压缩的紧凑标注切片快照, 用于一步重置撤销. ✅
//! 3. 切片与一致度图的灰度图像导出. ✅

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 带符号二维图像坐标. 指针事件给出的坐标可能落在网格外, 因此允许取负.
pub type Idx2dI32 = (i32, i32);

/// RAW 体数据基础数据结构.
mod data;

pub use data::{
    AnnotatedVolume, BorderGrid, CompactMarkSlice, GridSlice, GridSliceMut, ImgWriteRaw,
    ImgWriteVis, MarkGrid, MarkMirror, OwnedGridSlice, ScanGrid, SuperpixelGrid, VolumeGrid,
};

pub mod consts;

pub mod codec;

pub mod naming;

pub mod annotate;

pub use annotate::PenSize;

pub mod aggregate;

pub mod dataset;
pub mod session;
pub mod prelude;
