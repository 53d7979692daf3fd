//! # facecap
//!
//! Capture character avatars from a video, guided by its subtitles.
//!
//! Running face analysis on every frame of an episode is wasteful. `facecap`
//! only looks where people are likely to be on screen and talking: it widens
//! every subtitle interval by a redundancy margin, keeps the decoder keyframes
//! that fall inside, and sends just those frames to a face-analysis service.
//! Faces that are confident, frontal and well framed are cropped to a padded
//! square, resized and saved as JPEG avatars together with their age, gender,
//! race and emotion.
//!
//! ## Quick Start
//!
//! ```no_run
//! use facecap::deepface::DeepFaceClient;
//! use facecap::pipeline::CaptureJob;
//! use facecap::{CaptureOptions, FaceCaptureError};
//!
//! let options = CaptureOptions::new()
//!     .with_frame_redundancy(50)
//!     .with_target_size(300, 300);
//! let job = CaptureJob::new("episode01.mp4", "episode01.srt", "avatars")
//!     .with_options(options);
//!
//! let mut analyzer = DeepFaceClient::new("http://127.0.0.1:5005")?;
//! for face in job.run(&mut analyzer)? {
//!     println!("{} {} {} {}", face.image_path.display(), face.age, face.gender, face.emotion);
//! }
//! # Ok::<(), FaceCaptureError>(())
//! ```
//!
//! ## Stages
//!
//! - [`subtitle`]: `hh:mm:ss,mmm --> hh:mm:ss,mmm` intervals from SRT text
//! - [`conversion`]: timestamps to frame numbers
//! - [`keyframe`]: padded candidate ranges intersected with decoder keyframes
//! - [`admission`]: confidence, frontal-pose and crop-geometry rules
//! - [`capture`]: per-keyframe analysis, cropping and saving
//! - [`pipeline`]: all of the above for one video
//!
//! Video access goes through the [`VideoSource`] trait (implemented by
//! [`MediaFile`] with FFmpeg) and face analysis through [`FaceAnalyzer`]
//! (implemented by [`deepface::DeepFaceClient`] over HTTP).
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `deepface` | HTTP client for a DeepFace-compatible service (default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod admission;
pub mod analysis;
pub mod capture;
pub mod category;
pub mod configuration;
pub mod conversion;
#[cfg(feature = "deepface")]
pub mod deepface;
pub mod error;
pub mod ffmpeg;
pub mod keyframe;
pub mod media;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod subtitle;
pub mod video;

pub use admission::{CropBox, FaceAttributes, FaceVerdict, RejectReason};
pub use analysis::{AttributeScores, FaceAnalysis, FaceAnalyzer, FaceRegion};
pub use capture::AcceptedFace;
pub use category::{Category, CategoryKind, Emotion, Gender, Race};
pub use configuration::{CaptureConfig, CaptureOptions};
pub use error::FaceCaptureError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use keyframe::CandidateFrameSet;
pub use media::MediaFile;
pub use metadata::VideoMetadata;
pub use pipeline::CaptureJob;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use subtitle::SubtitleInterval;
pub use video::{DecodedFrame, VideoSource};
