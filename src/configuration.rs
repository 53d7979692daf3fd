//! Capture configuration.
//!
//! [`CaptureOptions`] is a builder that threads the tunable parameters of a
//! run (redundancy margin, avatar size, pose and confidence thresholds) and
//! progress reporting through every pipeline stage. [`CaptureConfig`] is the
//! on-disk INI form read by the command-line tool.
//!
//! # Example
//!
//! ```
//! use facecap::CaptureOptions;
//!
//! let options = CaptureOptions::new()
//!     .with_frame_redundancy(25)
//!     .with_target_size(256, 256)
//!     .with_eye_diff_threshold(40.0);
//! assert_eq!(options.target_size(), (256, 256));
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use configparser::ini::Ini;

use crate::error::FaceCaptureError;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Frames of padding added on both sides of every subtitle interval.
pub const DEFAULT_FRAME_REDUNDANCY: u64 = 50;
/// Width and height of the saved avatar images.
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (300, 300);
/// Minimum horizontal eye distance, in pixels, for a face to count as frontal.
pub const DEFAULT_EYE_DIFF_THRESHOLD: f64 = 50.0;
/// Minimum detector confidence for a face to be considered at all.
pub const DEFAULT_MIN_FACE_CONFIDENCE: f64 = 0.95;

/// Options for a capture run.
///
/// All fields have defaults matching the reference tool; a
/// default-constructed value is ready to use.
#[derive(Clone)]
pub struct CaptureOptions {
    pub(crate) frame_redundancy: u64,
    pub(crate) target_width: u32,
    pub(crate) target_height: u32,
    pub(crate) eye_diff_threshold: f64,
    pub(crate) min_face_confidence: f64,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
}

impl Debug for CaptureOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CaptureOptions")
            .field("frame_redundancy", &self.frame_redundancy)
            .field("target_width", &self.target_width)
            .field("target_height", &self.target_height)
            .field("eye_diff_threshold", &self.eye_diff_threshold)
            .field("min_face_confidence", &self.min_face_confidence)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureOptions {
    /// Create options with the default settings.
    pub fn new() -> Self {
        Self {
            frame_redundancy: DEFAULT_FRAME_REDUNDANCY,
            target_width: DEFAULT_TARGET_SIZE.0,
            target_height: DEFAULT_TARGET_SIZE.1,
            eye_diff_threshold: DEFAULT_EYE_DIFF_THRESHOLD,
            min_face_confidence: DEFAULT_MIN_FACE_CONFIDENCE,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Set the padding, in frames, added around each subtitle interval.
    #[must_use]
    pub fn with_frame_redundancy(mut self, frames: u64) -> Self {
        self.frame_redundancy = frames;
        self
    }

    /// Set the resolution avatars are resized to. Zero is clamped to one.
    #[must_use]
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width.max(1);
        self.target_height = height.max(1);
        self
    }

    /// Set the horizontal eye distance a face must exceed to count as frontal.
    #[must_use]
    pub fn with_eye_diff_threshold(mut self, pixels: f64) -> Self {
        self.eye_diff_threshold = pixels;
        self
    }

    /// Set the minimum detector confidence. The bound is inclusive.
    #[must_use]
    pub fn with_min_face_confidence(mut self, confidence: f64) -> Self {
        self.min_face_confidence = confidence;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn frame_redundancy(&self) -> u64 {
        self.frame_redundancy
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    pub fn eye_diff_threshold(&self) -> f64 {
        self.eye_diff_threshold
    }

    pub fn min_face_confidence(&self) -> f64 {
        self.min_face_confidence
    }
}

/// Settings read from an INI configuration file.
///
/// Tuning keys live in the `[main]` section; per-run paths live in
/// `[face_conf.custom]`:
///
/// ```ini
/// [main]
/// frame_redundancy = 50
/// image_width = 300
/// image_height = 300
/// eye_diff_threshold = 50
/// min_face_confidence = 0.95
/// dry_run = false
///
/// [face_conf.custom]
/// video_path = /data/episode01.mp4
/// sub_path = /data/episode01.srt
/// avatar_output_path = /data/avatars/episode01
/// analysis_endpoint = http://127.0.0.1:5005
/// ```
///
/// Missing keys and empty values fall back to the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub frame_redundancy: u64,
    pub image_width: u32,
    pub image_height: u32,
    pub eye_diff_threshold: f64,
    pub min_face_confidence: f64,
    pub dry_run: bool,
    pub video_path: Option<PathBuf>,
    pub subtitle_path: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub analysis_endpoint: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_redundancy: DEFAULT_FRAME_REDUNDANCY,
            image_width: DEFAULT_TARGET_SIZE.0,
            image_height: DEFAULT_TARGET_SIZE.1,
            eye_diff_threshold: DEFAULT_EYE_DIFF_THRESHOLD,
            min_face_confidence: DEFAULT_MIN_FACE_CONFIDENCE,
            dry_run: false,
            video_path: None,
            subtitle_path: None,
            output_directory: None,
            analysis_endpoint: None,
        }
    }
}

impl CaptureConfig {
    /// Section holding the tuning parameters.
    pub const MAIN_SECTION: &'static str = "main";
    /// Section holding the per-run paths.
    pub const PATHS_SECTION: &'static str = "face_conf.custom";

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// - [`FaceCaptureError::ConfigurationMissing`] if `path` does not exist.
    /// - [`FaceCaptureError::ConfigurationError`] if the file cannot be read
    ///   or a value does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FaceCaptureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FaceCaptureError::ConfigurationMissing(path.to_path_buf()));
        }

        log::debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Parse configuration text. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::ConfigurationError`] if the text is not
    /// valid INI or a value does not parse.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, FaceCaptureError> {
        let mut ini = Ini::new();
        ini.read(text.to_string())
            .map_err(|reason| configuration_error(origin, reason))?;

        let defaults = Self::default();
        let main = Self::MAIN_SECTION;
        let paths = Self::PATHS_SECTION;

        let dry_run = match value(&ini, main, "dry_run") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                configuration_error(origin, format!("[{main}] dry_run: not a boolean: {raw:?}"))
            })?,
            None => defaults.dry_run,
        };

        Ok(Self {
            frame_redundancy: parse_key(&ini, main, "frame_redundancy", origin)?
                .unwrap_or(defaults.frame_redundancy),
            image_width: parse_key(&ini, main, "image_width", origin)?
                .unwrap_or(defaults.image_width),
            image_height: parse_key(&ini, main, "image_height", origin)?
                .unwrap_or(defaults.image_height),
            eye_diff_threshold: parse_key(&ini, main, "eye_diff_threshold", origin)?
                .unwrap_or(defaults.eye_diff_threshold),
            min_face_confidence: parse_key(&ini, main, "min_face_confidence", origin)?
                .unwrap_or(defaults.min_face_confidence),
            dry_run,
            video_path: value(&ini, paths, "video_path").map(PathBuf::from),
            subtitle_path: value(&ini, paths, "sub_path").map(PathBuf::from),
            output_directory: value(&ini, paths, "avatar_output_path").map(PathBuf::from),
            analysis_endpoint: value(&ini, paths, "analysis_endpoint"),
        })
    }

    /// The tuning parameters as [`CaptureOptions`].
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions::new()
            .with_frame_redundancy(self.frame_redundancy)
            .with_target_size(self.image_width, self.image_height)
            .with_eye_diff_threshold(self.eye_diff_threshold)
            .with_min_face_confidence(self.min_face_confidence)
    }
}

/// A trimmed, non-empty value, if the key is present.
fn value(ini: &Ini, section: &str, key: &str) -> Option<String> {
    ini.get(section, key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_key<T>(
    ini: &Ini,
    section: &str,
    key: &str,
    origin: &Path,
) -> Result<Option<T>, FaceCaptureError>
where
    T: FromStr,
    T::Err: Display,
{
    value(ini, section, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|error| {
                configuration_error(origin, format!("[{section}] {key} = {raw:?}: {error}"))
            })
        })
        .transpose()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "y" | "yes" | "yeah" | "on" => Some(true),
        "false" | "0" | "f" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn configuration_error(origin: &Path, reason: impl Into<String>) -> FaceCaptureError {
    FaceCaptureError::ConfigurationError {
        path: origin.to_path_buf(),
        reason: reason.into(),
    }
}
