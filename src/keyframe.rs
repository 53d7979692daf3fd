//! Subtitle-guided keyframe selection.
//!
//! Faces are only looked for where somebody is likely to be talking: around
//! subtitle intervals. Each interval is widened by a redundancy margin to
//! absorb timing drift, the widened ranges are unioned into a
//! [`CandidateFrameSet`], and one sequential decode pass keeps the candidates
//! that the decoder flags as keyframes.
//!
//! # Example
//!
//! ```no_run
//! use facecap::{FaceCaptureError, MediaFile};
//! use facecap::keyframe::select_keyframes;
//! use facecap::subtitle::read_subtitle_file;
//!
//! let intervals = read_subtitle_file("input.srt")?;
//! let mut video = MediaFile::open("input.mp4")?;
//! let keyframes = select_keyframes(&mut video, &intervals, 50)?;
//! println!("{} keyframes to analyze", keyframes.len());
//! # Ok::<(), FaceCaptureError>(())
//! ```

use std::collections::BTreeSet;
use std::ops::{ControlFlow, RangeInclusive};

use crate::configuration::CaptureOptions;
use crate::error::FaceCaptureError;
use crate::progress::{OperationType, ProgressTracker};
use crate::subtitle::SubtitleInterval;
use crate::video::VideoSource;

/// A set of frame numbers, stored as sorted, disjoint, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFrameSet {
    ranges: Vec<RangeInclusive<u64>>,
}

impl CandidateFrameSet {
    /// Union arbitrary (possibly overlapping, unordered) closed ranges.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = RangeInclusive<u64>>,
    {
        let mut sorted: Vec<RangeInclusive<u64>> =
            ranges.into_iter().filter(|range| !range.is_empty()).collect();
        sorted.sort_unstable_by_key(|range| *range.start());

        let mut merged: Vec<RangeInclusive<u64>> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if *range.start() <= last.end().saturating_add(1) => {
                    if range.end() > last.end() {
                        *last = *last.start()..=*range.end();
                    }
                }
                _ => merged.push(range),
            }
        }

        Self { ranges: merged }
    }

    /// Build the candidate set for a list of subtitle intervals.
    ///
    /// Every interval contributes
    /// `[max(0, start - redundancy), min(total_frames - 1, end + redundancy)]`.
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::InvalidTimestamp`] if an interval bound is
    /// not an `hh:mm:ss,mmm` timestamp.
    pub fn from_intervals(
        intervals: &[SubtitleInterval],
        frame_redundancy: u64,
        frame_rate: u32,
        total_frames: u64,
    ) -> Result<Self, FaceCaptureError> {
        let mut ranges = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let (start_frame, end_frame) = interval.frame_bounds(frame_rate)?;
            if let Some(range) =
                padded_frame_range(start_frame, end_frame, frame_redundancy, total_frames)
            {
                ranges.push(range);
            }
        }
        Ok(Self::from_ranges(ranges))
    }

    /// Whether `frame_number` is a candidate.
    pub fn contains(&self, frame_number: u64) -> bool {
        self.ranges
            .binary_search_by(|range| {
                if *range.end() < frame_number {
                    std::cmp::Ordering::Less
                } else if *range.start() > frame_number {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Number of candidate frames.
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .map(|range| range.end() - range.start() + 1)
            .sum()
    }

    /// Whether the set holds no frames at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The highest candidate frame, if any.
    pub fn last(&self) -> Option<u64> {
        self.ranges.last().map(|range| *range.end())
    }

    /// The merged ranges, in ascending order.
    pub fn ranges(&self) -> &[RangeInclusive<u64>] {
        &self.ranges
    }

    /// Every candidate frame, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ranges.iter().flat_map(|range| range.clone())
    }
}

/// Widen `[start_frame, end_frame]` by `frame_redundancy` on both sides and
/// clamp it to the video's frame range.
///
/// Returns `None` for a video without frames, or when the clamped range is
/// empty (an interval that ends before it starts, or lies past the end of
/// the video).
pub fn padded_frame_range(
    start_frame: u64,
    end_frame: u64,
    frame_redundancy: u64,
    total_frames: u64,
) -> Option<RangeInclusive<u64>> {
    let last_frame = total_frames.checked_sub(1)?;
    let low = start_frame.saturating_sub(frame_redundancy);
    let high = end_frame.saturating_add(frame_redundancy).min(last_frame);
    (low <= high).then_some(low..=high)
}

/// Select the keyframes that fall inside padded subtitle intervals.
///
/// Shorthand for [`select_keyframes_with_options`] with default options and
/// the given redundancy.
///
/// # Errors
///
/// See [`select_keyframes_with_options`].
pub fn select_keyframes<V: VideoSource>(
    video: &mut V,
    intervals: &[SubtitleInterval],
    frame_redundancy: u64,
) -> Result<Vec<u64>, FaceCaptureError> {
    let options = CaptureOptions::new().with_frame_redundancy(frame_redundancy);
    select_keyframes_with_options(video, intervals, &options)
}

/// Select the keyframes that fall inside padded subtitle intervals, reporting
/// scan progress through `options`.
///
/// The result is strictly ascending. A failing decode pass does not abort the
/// run: the failure is logged and the keyframes found before it are returned
/// (none at all when decoding never got going).
///
/// # Errors
///
/// Returns [`FaceCaptureError::InvalidTimestamp`] if an interval bound cannot
/// be parsed.
pub fn select_keyframes_with_options<V: VideoSource>(
    video: &mut V,
    intervals: &[SubtitleInterval],
    options: &CaptureOptions,
) -> Result<Vec<u64>, FaceCaptureError> {
    let frame_rate = video.frame_rate();
    let total_frames = video.total_frames();

    let candidates = CandidateFrameSet::from_intervals(
        intervals,
        options.frame_redundancy,
        frame_rate,
        total_frames,
    )?;
    log::debug!(
        "{} candidate frames in {} ranges (fps={}, total_frames={}, redundancy={})",
        candidates.len(),
        candidates.ranges().len(),
        frame_rate,
        total_frames,
        options.frame_redundancy
    );

    let Some(last_candidate) = candidates.last() else {
        log::info!("No candidate frames; skipping keyframe scan");
        return Ok(Vec::new());
    };

    let mut keyframes: BTreeSet<u64> = BTreeSet::new();
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::KeyframeScan,
        Some(last_candidate + 1),
        options.batch_size,
    );

    let scan = video.scan_frames(|frame| {
        tracker.advance(Some(frame.index));
        if frame.is_keyframe && candidates.contains(frame.index) {
            keyframes.insert(frame.index);
        }
        if frame.index >= last_candidate {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    tracker.finish();

    if let Err(error) = scan {
        log::error!("Error while decoding video for keyframes: {error}");
    }

    let keyframes: Vec<u64> = keyframes.into_iter().collect();
    log::info!("Keyframes to process: {keyframes:?}");
    Ok(keyframes)
}
