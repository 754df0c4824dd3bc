//! Sequence file writing
//!
//! Captured frames are persisted as NRRD volumes: one 2D slice per frame
//! stacked along a `list` axis, with per-frame timestamps, transforms and
//! custom fields stored as `Seq_FrameNNNN_*` key/value lines in the header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, Result, ResultExt};
use crate::types::FrameTag;

use super::frame::TrackedFrame;

/// File extension of written sequences
pub const SEQUENCE_FILE_EXTENSION: &str = "nrrd";

/// Timestamp format used in sequence file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Image orientation tag: first letter is the image x axis (Marked/Unmarked
/// transducer side), second the y axis (Near/Far from the transducer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageOrientation {
    MF,
    MN,
    #[default]
    FM,
    FN,
    #[serde(rename = "UN")]
    Unknown,
}

impl fmt::Display for ImageOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageOrientation::MF => "MF",
            ImageOrientation::MN => "MN",
            ImageOrientation::FM => "FM",
            ImageOrientation::FN => "FN",
            ImageOrientation::Unknown => "UN",
        };
        f.write_str(s)
    }
}

/// Serializes an ordered list of frames to a file
pub trait SequenceWriter: Send {
    fn write(
        &mut self,
        path: &Path,
        frames: &[TrackedFrame],
        orientation: ImageOrientation,
    ) -> Result<()>;
}

/// Writes frames as an NRRD sequence with an attached raw payload
#[derive(Debug, Default, Clone)]
pub struct NrrdSequenceWriter;

impl NrrdSequenceWriter {
    pub fn new() -> Self {
        Self
    }

    fn header(frames: &[TrackedFrame], orientation: ImageOrientation) -> Result<String> {
        let first = &frames[0].image;
        if first.is_empty() {
            return Err(RecorderError::WriteFailure(
                "frame image has no pixels".to_string(),
            ));
        }
        for (i, frame) in frames.iter().enumerate() {
            if frame.image.width != first.width || frame.image.height != first.height {
                return Err(RecorderError::WriteFailure(format!(
                    "frame {} is {}x{}, expected {}x{}",
                    i, frame.image.width, frame.image.height, first.width, first.height
                )));
            }
            if !frame.image.is_consistent() {
                return Err(RecorderError::WriteFailure(format!(
                    "frame {} pixel buffer does not match its size",
                    i
                )));
            }
        }

        let mut header = String::new();
        header.push_str("NRRD0004\n");
        header.push_str("# Complete NRRD file format specification at:\n");
        header.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
        header.push_str("type: uint8\n");
        header.push_str("dimension: 3\n");
        header.push_str("space dimension: 3\n");
        header.push_str(&format!(
            "sizes: {} {} {}\n",
            first.width,
            first.height,
            frames.len()
        ));
        header.push_str("kinds: domain domain list\n");
        header.push_str("endian: little\n");
        header.push_str("encoding: raw\n");
        header.push_str(&format!("UltrasoundImageOrientation:={}\n", orientation));

        for (i, frame) in frames.iter().enumerate() {
            let prefix = format!("Seq_Frame{:04}", i);
            header.push_str(&format!("{}_Timestamp:={:.6}\n", prefix, frame.timestamp));
            for transform in &frame.transforms {
                let values: Vec<String> = transform.matrix.iter().map(|v| v.to_string()).collect();
                header.push_str(&format!(
                    "{}_{}Transform:={}\n",
                    prefix,
                    transform.name,
                    values.join(" ")
                ));
                header.push_str(&format!(
                    "{}_{}TransformStatus:={}\n",
                    prefix,
                    transform.name,
                    transform.status.as_str()
                ));
            }
            for (key, value) in &frame.custom_fields {
                header.push_str(&format!("{}_{}:={}\n", prefix, key, value));
            }
        }
        header.push('\n');
        Ok(header)
    }
}

impl SequenceWriter for NrrdSequenceWriter {
    fn write(
        &mut self,
        path: &Path,
        frames: &[TrackedFrame],
        orientation: ImageOrientation,
    ) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(RecorderError::WriteFailure(
                "output file name is empty".to_string(),
            ));
        }
        if frames.is_empty() {
            return Err(RecorderError::WriteFailure(
                "no frames to write".to_string(),
            ));
        }

        let header = Self::header(frames, orientation)?;
        write_atomically(path, |out| {
            out.write_all(header.as_bytes())
                .with_context(|| format!("Writing header of {:?}", path))?;
            for frame in frames {
                out.write_all(&frame.image.pixels)
                    .with_context(|| format!("Writing pixels of {:?}", path))?;
            }
            Ok(())
        })?;

        tracing::debug!("Wrote {} frame(s) to {:?}", frames.len(), path);
        Ok(())
    }
}

/// `<path>.part`, the file a sequence is written to before it is renamed
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Write through a `.part` file next to `path` and rename it into place
/// once complete. On error the partial file is removed and `path` is left
/// untouched.
fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = partial_path(path);
    let result = File::create(&partial)
        .with_context(|| format!("Creating {:?}", partial))
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            fill(&mut out)?;
            out.flush()
                .with_context(|| format!("Flushing {:?}", partial))
        })
        .and_then(|()| {
            std::fs::rename(&partial, path)
                .with_context(|| format!("Renaming {:?} to {:?}", partial, path))
        });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&partial) {
            tracing::debug!("Could not remove {:?}: {}", partial, e);
        }
    }
    result
}

/// `<folder>/<base>-<freq>MHz-<volts>V-<timestamp>.nrrd`
pub fn sequence_file_path(
    folder: &Path,
    base_name: &str,
    tag: &FrameTag,
    timestamp: &chrono::DateTime<chrono::Local>,
) -> PathBuf {
    folder.join(format!(
        "{}-{}-{}.{}",
        base_name,
        tag.file_segment(),
        timestamp.format(FILE_TIMESTAMP_FORMAT),
        SEQUENCE_FILE_EXTENSION
    ))
}

/// First of `path`, `<stem>-1.nrrd`, `<stem>-2.nrrd`, ... that is neither on
/// disk nor in `taken`
pub fn unique_sequence_file_path(path: PathBuf, taken: &[PathBuf]) -> PathBuf {
    let is_free = |candidate: &PathBuf| !candidate.exists() && !taken.contains(candidate);
    if is_free(&path) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| SEQUENCE_FILE_EXTENSION.to_string());
    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{}-{}.{}", stem, n, extension));
        if is_free(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Outcome of writing the recorded buffer out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Files written, in capture order
    pub written: Vec<PathBuf>,
    /// Frames that could not be written, with the reason
    pub failed: Vec<(FrameTag, String)>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}
