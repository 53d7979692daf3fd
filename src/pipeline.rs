//! End-to-end capture for one video.
//!
//! A [`CaptureJob`] ties a video, its subtitle file and an output directory
//! to a set of [`CaptureOptions`], then runs keyframe selection followed by
//! face capture. [`capture_avatars`] is the same sequence over any
//! [`VideoSource`], which is what the tests drive.
//!
//! # Example
//!
//! ```no_run
//! use facecap::pipeline::CaptureJob;
//! use facecap::deepface::DeepFaceClient;
//! use facecap::{CaptureOptions, FaceCaptureError};
//!
//! let job = CaptureJob::new("episode01.mp4", "episode01.srt", "avatars/episode01")
//!     .with_options(CaptureOptions::new().with_frame_redundancy(25));
//! let mut analyzer = DeepFaceClient::new("http://127.0.0.1:5005")?;
//! for face in job.run(&mut analyzer)? {
//!     println!("{}", face.image_path.display());
//! }
//! # Ok::<(), FaceCaptureError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::FaceAnalyzer;
use crate::capture::{capture_faces, AcceptedFace};
use crate::configuration::CaptureOptions;
use crate::error::FaceCaptureError;
use crate::keyframe::select_keyframes_with_options;
use crate::media::MediaFile;
use crate::subtitle::{read_subtitle_file, SubtitleInterval};
use crate::video::VideoSource;

/// One video, one subtitle file, one output directory.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    video_path: PathBuf,
    subtitle_path: PathBuf,
    output_directory: PathBuf,
    options: CaptureOptions,
}

impl CaptureJob {
    pub fn new<V, S, O>(video_path: V, subtitle_path: S, output_directory: O) -> Self
    where
        V: Into<PathBuf>,
        S: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            video_path: video_path.into(),
            subtitle_path: subtitle_path.into(),
            output_directory: output_directory.into(),
            options: CaptureOptions::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Select the keyframes that would be analyzed, without analyzing them
    /// or writing anything.
    ///
    /// # Errors
    ///
    /// Fails if the subtitle file cannot be read, the video cannot be opened,
    /// or a subtitle timestamp is malformed.
    pub fn plan(&self) -> Result<Vec<u64>, FaceCaptureError> {
        let intervals = read_subtitle_file(&self.subtitle_path)?;
        let mut video = MediaFile::open(&self.video_path)?;
        select_keyframes_with_options(&mut video, &intervals, &self.options)
    }

    /// Run the full capture with `analyzer`.
    ///
    /// # Errors
    ///
    /// Fails on any fatal error: unreadable subtitles, an output directory
    /// that cannot be created, a video that cannot be opened, or an unknown
    /// attribute label.
    pub fn run<A: FaceAnalyzer>(&self, analyzer: &mut A) -> Result<Vec<AcceptedFace>, FaceCaptureError> {
        let intervals = read_subtitle_file(&self.subtitle_path)?;
        ensure_output_directory(&self.output_directory)?;
        let mut video = MediaFile::open(&self.video_path)?;
        select_and_capture(
            &mut video,
            analyzer,
            &intervals,
            &self.output_directory,
            &self.options,
        )
    }
}

/// Select keyframes from `intervals` and capture the faces in them.
///
/// The output directory is created if needed.
///
/// # Errors
///
/// See [`CaptureJob::run`].
pub fn capture_avatars<V, A>(
    video: &mut V,
    analyzer: &mut A,
    intervals: &[SubtitleInterval],
    output_directory: &Path,
    options: &CaptureOptions,
) -> Result<Vec<AcceptedFace>, FaceCaptureError>
where
    V: VideoSource,
    A: FaceAnalyzer,
{
    ensure_output_directory(output_directory)?;
    select_and_capture(video, analyzer, intervals, output_directory, options)
}

fn select_and_capture<V, A>(
    video: &mut V,
    analyzer: &mut A,
    intervals: &[SubtitleInterval],
    output_directory: &Path,
    options: &CaptureOptions,
) -> Result<Vec<AcceptedFace>, FaceCaptureError>
where
    V: VideoSource,
    A: FaceAnalyzer,
{
    let keyframes = select_keyframes_with_options(video, intervals, options)?;
    let faces = capture_faces(video, analyzer, &keyframes, output_directory, options)?;

    log::info!(
        "Captured {} face(s) from {} keyframe(s)",
        faces.len(),
        keyframes.len()
    );
    for face in &faces {
        log::info!("{:?}", face.as_record());
    }
    Ok(faces)
}

fn ensure_output_directory(path: &Path) -> Result<(), FaceCaptureError> {
    log::debug!("Ensuring output directory {}", path.display());
    fs::create_dir_all(path)?;
    Ok(())
}
