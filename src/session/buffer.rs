//! Ordered buffer of frames captured during a sweep

use crate::error::{RecorderError, Result};
use crate::types::FrameTag;

use super::frame::{RecordedFrame, TrackedFrame};

/// Custom field holding the acquisition settings of a recorded frame
pub const RECORD_INFORMATION_FIELD: &str = "RecordInformation";

/// Validation applied when appending a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationRequirement {
    /// Accept everything
    None,
    /// Reject a frame whose timestamp is already in the list
    #[default]
    UniqueTimestamp,
}

/// Append-only list of tagged frames
#[derive(Debug, Default)]
pub struct TrackedFrameList {
    frames: Vec<RecordedFrame>,
    validation: ValidationRequirement,
}

impl TrackedFrameList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(validation: ValidationRequirement) -> Self {
        Self {
            frames: Vec::new(),
            validation,
        }
    }

    /// Validate and append a frame
    ///
    /// Frames whose transforms are all invalid, or that fail the list's
    /// validation requirement, are returned as
    /// [`RecorderError::FrameCommitRejected`] and the list is left unchanged.
    pub fn add_tracked_frame(&mut self, mut frame: TrackedFrame, tag: FrameTag) -> Result<()> {
        if !frame.is_recordable() {
            return Err(RecorderError::FrameCommitRejected(
                "all the tool transforms are invalid".to_string(),
            ));
        }
        if self.validation == ValidationRequirement::UniqueTimestamp
            && self.frames.iter().any(|f| f.frame.timestamp == frame.timestamp)
        {
            return Err(RecorderError::FrameCommitRejected(format!(
                "duplicate timestamp {:.6}",
                frame.timestamp
            )));
        }

        frame.set_custom_field(RECORD_INFORMATION_FIELD, tag.file_segment());
        self.frames.push(RecordedFrame { frame, tag });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }

    /// Remove and return all frames, leaving the list empty
    pub fn take_frames(&mut self) -> Vec<RecordedFrame> {
        std::mem::take(&mut self.frames)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
