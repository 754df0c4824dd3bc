//! Tracked frame data types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::FrameTag;

/// Validity of a spatial transform attached to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransformStatus {
    #[default]
    Ok,
    Invalid,
}

impl TransformStatus {
    /// Name used in sequence files
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformStatus::Ok => "OK",
            TransformStatus::Invalid => "INVALID",
        }
    }
}

/// A named 4x4 homogeneous transform (row major)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    pub name: String,
    pub matrix: [f64; 16],
    pub status: TransformStatus,
}

impl FrameTransform {
    pub const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    pub fn new(name: impl Into<String>, status: TransformStatus) -> Self {
        Self {
            name: name.into(),
            matrix: Self::IDENTITY,
            status,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == TransformStatus::Ok
    }
}

/// 8-bit grayscale image, row major
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl FrameImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Black image of the given size
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![0; width * height])
    }

    /// Whether the pixel buffer matches the dimensions
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Mean pixel intensity
    pub fn mean_intensity(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().map(|&p| p as f64).sum::<f64>() / self.pixels.len() as f64
    }
}

/// A frame captured from the probe with its tracking data
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackedFrame {
    /// Acquisition time in seconds
    pub timestamp: f64,
    pub image: FrameImage,
    pub transforms: Vec<FrameTransform>,
    /// Free-form key/value fields written next to the frame
    pub custom_fields: BTreeMap<String, String>,
}

impl TrackedFrame {
    pub fn new(timestamp: f64, image: FrameImage) -> Self {
        Self {
            timestamp,
            image,
            transforms: Vec::new(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_transform(mut self, transform: FrameTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// A frame may be recorded if it carries no transforms at all, or at
    /// least one of its transforms is valid
    pub fn is_recordable(&self) -> bool {
        self.transforms.is_empty() || self.transforms.iter().any(FrameTransform::is_valid)
    }

    pub fn set_custom_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_fields.insert(key.into(), value.into());
    }

    pub fn custom_field(&self, key: &str) -> Option<&str> {
        self.custom_fields.get(key).map(String::as_str)
    }
}

/// A frame committed to the sweep buffer together with its settings
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub frame: TrackedFrame,
    pub tag: FrameTag,
}
