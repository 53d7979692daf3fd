//! Timestamp and frame-number conversions.
//!
//! Subtitle timestamps (`hh:mm:ss,mmm`) are turned into frame numbers with
//! [`timestamp_to_frame_number`]. The crate-private helpers below convert
//! between FFmpeg presentation timestamps, seek positions and frame numbers,
//! and strip row padding from decoded frames.

use std::sync::OnceLock;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use regex::Regex;

use crate::error::FaceCaptureError;

/// Pattern of a single SubRip timestamp, without anchors.
pub(crate) const TIMESTAMP_PATTERN: &str = r"([0-9]{2}):([0-9]{2}):([0-9]{2}),([0-9]{3})";

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&format!("^{TIMESTAMP_PATTERN}$")).expect("timestamp pattern is valid")
    })
}

/// Parse an `hh:mm:ss,mmm` timestamp into elapsed seconds.
///
/// # Errors
///
/// Returns [`FaceCaptureError::InvalidTimestamp`] if `text` does not have
/// exactly that shape.
///
/// # Example
///
/// ```
/// use facecap::conversion::timestamp_to_seconds;
///
/// assert_eq!(timestamp_to_seconds("00:01:02,500")?, 62.5);
/// # Ok::<(), facecap::FaceCaptureError>(())
/// ```
pub fn timestamp_to_seconds(text: &str) -> Result<f64, FaceCaptureError> {
    let captures = timestamp_regex()
        .captures(text)
        .ok_or_else(|| FaceCaptureError::InvalidTimestamp(text.to_string()))?;

    // The pattern only admits ASCII digits, so every group parses.
    let field = |index: usize| -> u32 { captures[index].parse().unwrap_or_default() };
    let (hours, minutes, seconds, milliseconds) = (field(1), field(2), field(3), field(4));

    Ok(f64::from(hours * 3600 + minutes * 60 + seconds) + f64::from(milliseconds) / 1000.0)
}

/// Convert a subtitle timestamp into the index of the frame shown at that
/// moment, for a video running at `frame_rate` frames per second.
///
/// The product of elapsed seconds and frame rate is truncated toward zero.
///
/// # Errors
///
/// Returns [`FaceCaptureError::InvalidTimestamp`] if `text` is not an
/// `hh:mm:ss,mmm` timestamp.
///
/// # Example
///
/// ```
/// use facecap::conversion::timestamp_to_frame_number;
///
/// assert_eq!(timestamp_to_frame_number("00:00:01,000", 25)?, 25);
/// assert_eq!(timestamp_to_frame_number("00:00:02,030", 25)?, 50);
/// # Ok::<(), facecap::FaceCaptureError>(())
/// ```
pub fn timestamp_to_frame_number(text: &str, frame_rate: u32) -> Result<u64, FaceCaptureError> {
    let seconds = timestamp_to_seconds(text)?;
    Ok((seconds * f64::from(frame_rate)) as u64)
}

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3), which
/// [`image::RgbImage::from_raw`] does not accept.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * (height as usize)].to_vec();
    }

    data.chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

/// Rescale a PTS value in the stream's time base to a frame number.
pub(crate) fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds =
        pts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator().max(1));
    (seconds * frames_per_second).max(0.0) as u64
}

/// Convert a frame number into a container-level seek position.
///
/// `Input::seek` expects AV_TIME_BASE units (microseconds), not the stream
/// time base.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    if frames_per_second <= 0.0 {
        return 0;
    }
    (frame_number as f64 / frames_per_second * 1_000_000.0) as i64
}
