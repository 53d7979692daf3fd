//! Subtitle timing extraction.
//!
//! Only the timing lines of a SubRip document matter here: each
//! `hh:mm:ss,mmm --> hh:mm:ss,mmm` line marks an interval during which
//! somebody is (probably) speaking on screen. Cue numbers, text and blank
//! lines are ignored.
//!
//! # Example
//!
//! ```
//! use facecap::subtitle::parse_subtitle_intervals;
//!
//! let document = "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n";
//! let intervals = parse_subtitle_intervals(document);
//! assert_eq!(intervals.len(), 1);
//! assert_eq!(intervals[0].start, "00:00:01,000");
//! assert_eq!(intervals[0].end, "00:00:02,500");
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::conversion::{TIMESTAMP_PATTERN, timestamp_to_frame_number};
use crate::error::FaceCaptureError;

/// One subtitle display interval, kept in its textual `hh:mm:ss,mmm` form.
///
/// Intervals are not validated: `start` may come after `end`, and
/// successive intervals may overlap or run backwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtitleInterval {
    /// When the subtitle appears.
    pub start: String,
    /// When the subtitle disappears.
    pub end: String,
}

impl SubtitleInterval {
    /// Create an interval from two timestamps.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Translate both bounds into frame numbers.
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::InvalidTimestamp`] if either bound is not
    /// an `hh:mm:ss,mmm` timestamp.
    pub fn frame_bounds(&self, frame_rate: u32) -> Result<(u64, u64), FaceCaptureError> {
        Ok((
            timestamp_to_frame_number(&self.start, frame_rate)?,
            timestamp_to_frame_number(&self.end, frame_rate)?,
        ))
    }
}

impl Display for SubtitleInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} --> {}", self.start, self.end)
    }
}

fn interval_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        let single = TIMESTAMP_PATTERN.replace(['(', ')'], "");
        Regex::new(&format!("({single}) --> ({single})")).expect("interval pattern is valid")
    })
}

/// Extract every timing line from a subtitle document, in document order.
///
/// A document without timing lines yields an empty list.
pub fn parse_subtitle_intervals(document: &str) -> Vec<SubtitleInterval> {
    interval_regex()
        .captures_iter(document)
        .map(|captures| SubtitleInterval::new(&captures[1], &captures[2]))
        .collect()
}

/// Read a UTF-8 subtitle file and extract its timing lines.
///
/// # Errors
///
/// Returns [`FaceCaptureError::IoError`] if the file cannot be read or is
/// not valid UTF-8.
pub fn read_subtitle_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<SubtitleInterval>, FaceCaptureError> {
    let path = path.as_ref();
    log::debug!("Reading subtitle file: {}", path.display());

    let document = std::fs::read_to_string(path)?;
    let intervals = parse_subtitle_intervals(&document);

    log::info!(
        "Found {} subtitle intervals in {}",
        intervals.len(),
        path.display()
    );
    Ok(intervals)
}
