//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx2dI32, Idx3d};

pub use crate::data::{
    AnnotatedVolume, BorderGrid, GridSlice, GridSliceMut, ImgWriteRaw, ImgWriteVis, MarkGrid,
    MarkMirror, OwnedGridSlice, ScanGrid, SuperpixelGrid, VolumeGrid,
};

pub use crate::aggregate::{AggregateMode, AgreementMap, AnnotationAggregator, AnnotatorMarks};
pub use crate::annotate::PenSize;
pub use crate::naming::{SegMethod, SpTier, VolumeMeta};
pub use crate::session::{
    AnnotationSession, DisplayOptions, EditMode, PointerButton, PointerState,
};

pub use crate::consts::mark::{CORR_ADDED, CORR_NONE, CORR_REMOVED, SP_LESION, SP_NONE};
pub use crate::consts::{PEN_SIZE_DEFAULT, PEN_SIZE_MAX};

pub use crate::dataset::{self, home_dataset_dir_with, LoadError, SaveError, VolumePaths};
