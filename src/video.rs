//! Video access for the capture pipeline.
//!
//! Keyframe status is only known while decoding sequentially, while face
//! analysis needs a handful of specific frames. [`VideoSource`] therefore
//! exposes two independent operations: a full sequential scan reporting each
//! frame's keyframe flag, and a seek-and-read of one frame by number.
//! [`MediaFile`] implements both with FFmpeg.

use std::ops::ControlFlow;

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{conversion, error::FaceCaptureError, media::MediaFile};

/// One frame as seen by a sequential decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Zero-based position of the frame in decode order.
    pub index: u64,
    /// Whether the decoder flagged the frame as a keyframe.
    pub is_keyframe: bool,
}

/// A video that faces can be captured from.
pub trait VideoSource {
    /// Integer frames per second used to translate subtitle timestamps.
    fn frame_rate(&self) -> u32;

    /// Number of frames in the video.
    fn total_frames(&self) -> u64;

    /// Decode the whole video once, from the first frame, calling `handler`
    /// for every decoded frame. Returning [`ControlFlow::Break`] from the
    /// handler ends the pass early.
    ///
    /// Implementations skip over undecodable packets and only return an error
    /// when the pass cannot continue at all.
    fn scan_frames<F>(&mut self, handler: F) -> Result<(), FaceCaptureError>
    where
        F: FnMut(DecodedFrame) -> ControlFlow<()>;

    /// Seek to `frame_number` and read that single frame as RGB.
    fn read_frame(&mut self, frame_number: u64) -> Result<RgbImage, FaceCaptureError>;
}

impl VideoSource for MediaFile {
    fn frame_rate(&self) -> u32 {
        self.metadata.frame_rate
    }

    fn total_frames(&self) -> u64 {
        self.metadata.frame_count
    }

    fn scan_frames<F>(&mut self, mut handler: F) -> Result<(), FaceCaptureError>
    where
        F: FnMut(DecodedFrame) -> ControlFlow<()>,
    {
        let video_stream_index = self.video_stream_index;
        log::debug!(
            "Scanning keyframe flags of {} (stream={})",
            self.file_path.display(),
            video_stream_index
        );

        let mut decoder = self.fresh_decoder()?;

        let first_timestamp: i64 = 0;
        if let Err(error) = self.input_context.seek(first_timestamp, ..first_timestamp) {
            log::debug!("Rewind before keyframe scan failed: {error}");
        }

        let mut decoded_frame = VideoFrame::empty();
        let mut next_index: u64 = 0;

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            if let Err(error) = decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet after frame {next_index}: {error}");
                continue;
            }

            if drain_decoder(&mut decoder, &mut decoded_frame, &mut next_index, &mut handler)
                .is_break()
            {
                return Ok(());
            }
        }

        decoder.send_eof()?;
        let _ = drain_decoder(&mut decoder, &mut decoded_frame, &mut next_index, &mut handler);

        log::debug!("Keyframe scan decoded {next_index} frames");
        Ok(())
    }

    fn read_frame(&mut self, frame_number: u64) -> Result<RgbImage, FaceCaptureError> {
        let total_frames = self.metadata.frame_count;
        if total_frames > 0 && frame_number >= total_frames {
            return Err(FaceCaptureError::FrameOutOfRange {
                frame_number,
                total_frames,
            });
        }

        let video_stream_index = self.video_stream_index;
        let frames_per_second = self.metadata.frames_per_second;
        let time_base = self
            .input_context
            .stream(video_stream_index)
            .ok_or(FaceCaptureError::NoVideoStream)?
            .time_base();

        let mut decoder = self.fresh_decoder()?;
        let (width, height) = (decoder.width(), decoder.height());
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        // Seek to the nearest keyframe at or before the target, then decode
        // forward until the target comes out of the decoder.
        let seek_timestamp =
            conversion::frame_number_to_seek_timestamp(frame_number, frames_per_second);
        self.input_context.seek(seek_timestamp, ..seek_timestamp)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();
        let reached_target = |frame: &VideoFrame| {
            let pts = frame.pts().unwrap_or(0);
            conversion::pts_to_frame_number(pts, time_base, frames_per_second) >= frame_number
        };

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            if let Err(error) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet while seeking frame {frame_number}: {error}");
                continue;
            }

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                if reached_target(&decoded_frame) {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return convert_frame_to_image(&rgb_frame, width, height);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if reached_target(&decoded_frame) {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return convert_frame_to_image(&rgb_frame, width, height);
            }
        }

        Err(FaceCaptureError::VideoDecodeError(format!(
            "Could not locate frame {frame_number} in the video stream"
        )))
    }
}

impl MediaFile {
    /// Build a new decoder from the video stream's codec parameters.
    fn fresh_decoder(&self) -> Result<VideoDecoder, FaceCaptureError> {
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(FaceCaptureError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        Ok(decoder_context.decoder().video()?)
    }
}

/// Hand every frame the decoder has ready to `handler`, numbering them.
fn drain_decoder<F>(
    decoder: &mut VideoDecoder,
    decoded_frame: &mut VideoFrame,
    next_index: &mut u64,
    handler: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(DecodedFrame) -> ControlFlow<()>,
{
    while decoder.receive_frame(decoded_frame).is_ok() {
        let frame = DecodedFrame {
            index: *next_index,
            is_keyframe: decoded_frame.is_key(),
        };
        *next_index += 1;
        handler(frame)?;
    }
    ControlFlow::Continue(())
}

/// Convert a scaled RGB24 video frame to an [`RgbImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<RgbImage, FaceCaptureError> {
    let buffer = conversion::frame_to_rgb_buffer(rgb_frame, width, height);
    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        FaceCaptureError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}
