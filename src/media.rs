//! Core [`MediaFile`] implementation.
//!
//! `MediaFile` opens a video with FFmpeg, locates its best video stream and
//! caches the stream's metadata. It is the production
//! [`VideoSource`](crate::VideoSource): the keyframe scan and the per-frame
//! reads of a capture run both go through it.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{error::FaceCaptureError, metadata::VideoMetadata};

/// An opened video file.
///
/// The FFmpeg demuxer context is owned by this struct and closed when it is
/// dropped, so the file handle is released on every exit path of a run.
///
/// # Example
///
/// ```no_run
/// use facecap::{FaceCaptureError, MediaFile};
///
/// let video = MediaFile::open("input.mp4")?;
/// println!("{} frames", video.metadata().frame_count);
/// # Ok::<(), FaceCaptureError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Cached metadata of the selected video stream.
    pub(crate) metadata: VideoMetadata,
    /// Index of the best video stream.
    pub(crate) video_stream_index: usize,
    /// Path to the opened media file (kept for error messages).
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, picks the best video
    /// stream and caches its metadata.
    ///
    /// # Errors
    ///
    /// - [`FaceCaptureError::FileOpen`] if the file cannot be opened or its
    ///   video decoder cannot be created.
    /// - [`FaceCaptureError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FaceCaptureError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening media file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| FaceCaptureError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| FaceCaptureError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(FaceCaptureError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
            FaceCaptureError::FileOpen {
                path: file_path.clone(),
                reason: format!(
                    "Failed to read video codec parameters for stream {video_stream_index}: {error}"
                ),
            }
        })?;
        let video_decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| FaceCaptureError::FileOpen {
                    path: file_path.clone(),
                    reason: format!(
                        "Failed to create video decoder for stream {video_stream_index}: {error}"
                    ),
                })?;

        // Average frame rate first, the stream's nominal rate as fallback.
        let frames_per_second = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
            .map(|rate| f64::from(rate.numerator()) / f64::from(rate.denominator()))
            .unwrap_or(0.0);

        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = video_decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: video_decoder.width(),
            height: video_decoder.height(),
            frames_per_second,
            frame_rate: frames_per_second as u32,
            frame_count,
            duration,
            codec,
        };

        if metadata.frames_per_second.fract() != 0.0 {
            log::warn!(
                "{} runs at {:.3} fps; subtitle timings are mapped at {} fps",
                file_path.display(),
                metadata.frames_per_second,
                metadata.frame_rate
            );
        }

        log::debug!("Opened {}: {:?}", file_path.display(), metadata);

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            file_path,
        })
    }

    /// Metadata of the selected video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
