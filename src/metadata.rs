//! Video stream metadata.
//!
//! [`VideoMetadata`] is extracted once when a [`MediaFile`](crate::MediaFile)
//! is opened and cached for the lifetime of the handle.

use std::time::Duration;

/// Metadata for the video stream that faces are captured from.
///
/// # Example
///
/// ```no_run
/// use facecap::MediaFile;
///
/// let video = MediaFile::open("input.mp4").unwrap();
/// let metadata = video.metadata();
/// println!("{}x{} @ {} fps", metadata.width, metadata.height, metadata.frame_rate);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate as reported by the stream.
    pub frames_per_second: f64,
    /// [`frames_per_second`](VideoMetadata::frames_per_second) truncated to an
    /// integer. Subtitle timestamps are translated with this value.
    pub frame_rate: u32,
    /// Number of frames in the stream. Taken from the container when it
    /// records one, otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Total duration of the media file.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
}
