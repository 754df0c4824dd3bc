//! Captured frame handling
//!
//! This module holds everything that happens to a frame after the probe
//! produced it: the tracked frame model, the ordered buffer frames are
//! committed to during a sweep, and the sequence writer that persists them.
//!
//! # Features
//!
//! - Transform validity gate for recording
//! - Duplicate-timestamp rejection on append
//! - Structured (frequency, pulse voltage) tags, rendered only for file names
//! - NRRD sequence output with a configurable image orientation

pub mod buffer;
pub mod frame;
pub mod writer;

pub use buffer::{TrackedFrameList, ValidationRequirement, RECORD_INFORMATION_FIELD};
pub use frame::{FrameImage, FrameTransform, RecordedFrame, TrackedFrame, TransformStatus};
pub use writer::{
    sequence_file_path, unique_sequence_file_path, FlushReport, ImageOrientation,
    NrrdSequenceWriter, SequenceWriter,
};
