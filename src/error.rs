//! Error types for the `facecap` crate.
//!
//! This module defines [`FaceCaptureError`], the unified error type returned by
//! all fallible operations in the crate. Only errors that break a precondition
//! of the whole run reach the caller; frame- and face-scoped problems are
//! logged and skipped inside the capture loop.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::category::CategoryKind;

/// The unified error type for all `facecap` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FaceCaptureError {
    /// The video file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The requested frame number exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame number that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// A subtitle timestamp did not match `hh:mm:ss,mmm`.
    #[error("Invalid timestamp: {0:?} (expected hh:mm:ss,mmm)")]
    InvalidTimestamp(String),

    /// The analysis service returned a label outside the fixed enumeration.
    #[error("Unknown {kind} category: {label:?}")]
    UnknownCategory {
        /// Which attribute the label belongs to.
        kind: CategoryKind,
        /// The raw label as returned by the service.
        label: String,
    },

    /// The configuration file does not exist.
    #[error("Configuration file {0} does not exist")]
    ConfigurationMissing(PathBuf),

    /// The configuration file exists but could not be read or holds a bad value.
    #[error("Invalid configuration in {path}: {reason}")]
    ConfigurationError {
        /// Path of the configuration file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The face-analysis service failed or answered with something unusable.
    #[error("Face analysis failed: {0}")]
    AnalysisError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while cropping, resizing or saving.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A face-analysis response could not be parsed.
    #[error("Malformed analysis response: {0}")]
    JsonError(#[from] JsonError),
}

impl From<FfmpegError> for FaceCaptureError {
    fn from(error: FfmpegError) -> Self {
        FaceCaptureError::FfmpegError(error.to_string())
    }
}

#[cfg(feature = "deepface")]
impl From<reqwest::Error> for FaceCaptureError {
    fn from(error: reqwest::Error) -> Self {
        FaceCaptureError::AnalysisError(error.to_string())
    }
}

impl FaceCaptureError {
    /// Whether this error must abort the whole run rather than just the
    /// frame being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FaceCaptureError::UnknownCategory { .. }
                | FaceCaptureError::FileOpen { .. }
                | FaceCaptureError::NoVideoStream
                | FaceCaptureError::ConfigurationMissing(_)
                | FaceCaptureError::ConfigurationError { .. }
        )
    }
}
