//! Per-face admission rules.
//!
//! Every rule here is a pure function of one [`FaceAnalysis`] and the
//! [`CaptureOptions`]. Rejections are values ([`FaceVerdict::Rejected`]);
//! the only error is an attribute label outside the known enumerations,
//! which aborts the run.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::Value;

use crate::analysis::{AttributeScores, FaceAnalysis, FaceRegion};
use crate::category::{Category, Emotion, Gender, Race};
use crate::configuration::CaptureOptions;
use crate::error::FaceCaptureError;

/// Padding added on each side of a face crop, in percent of the face size.
pub const CROP_PADDING_PERCENT: i64 = 30;

/// An `(x, y)` landmark.
pub type Point = (f64, f64);

/// Why a face was not admitted.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// `face_confidence` was absent or under the minimum.
    LowConfidence(Option<f64>),
    /// At least one eye landmark is absent.
    MissingEyes,
    /// An eye landmark is not a two-element numeric pair.
    MalformedEyes(String),
    /// The eyes are too close together horizontally: the face is turned.
    NotFrontal { eye_distance: f64 },
    /// The analysis carries no region, so there is nothing to crop.
    NoRegion,
    /// The region has a non-positive width or height.
    InvalidRegion { w: i64, h: i64 },
    /// The crop lies entirely outside the frame.
    EmptyCrop,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RejectReason::LowConfidence(Some(confidence)) => {
                write!(f, "face confidence {confidence} is too low")
            }
            RejectReason::LowConfidence(None) => write!(f, "face confidence is missing"),
            RejectReason::MissingEyes => write!(f, "eye landmarks are missing"),
            RejectReason::MalformedEyes(detail) => write!(f, "malformed eye landmarks: {detail}"),
            RejectReason::NotFrontal { eye_distance } => {
                write!(f, "not a frontal face (eye distance {eye_distance})")
            }
            RejectReason::NoRegion => write!(f, "no face region to crop"),
            RejectReason::InvalidRegion { w, h } => write!(f, "invalid face region {w}x{h}"),
            RejectReason::EmptyCrop => write!(f, "crop region is empty"),
        }
    }
}

impl RejectReason {
    /// The log level a rejection is reported at.
    pub fn log_level(&self) -> log::Level {
        match self {
            RejectReason::MissingEyes
            | RejectReason::MalformedEyes(_)
            | RejectReason::EmptyCrop => log::Level::Error,
            RejectReason::NoRegion => log::Level::Debug,
            _ => log::Level::Warn,
        }
    }
}

/// Resolved attributes of an admitted face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAttributes {
    pub age: f64,
    pub gender: Gender,
    pub race: Race,
    pub emotion: Emotion,
    pub gender_confidence: f64,
    pub race_confidence: f64,
    pub emotion_confidence: f64,
}

/// Outcome of the admission rules for one face.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceVerdict {
    Admitted(FaceAttributes),
    Rejected(RejectReason),
}

/// Whether a detector confidence clears `minimum`. Absent confidence fails.
pub fn passes_confidence(face_confidence: Option<f64>, minimum: f64) -> bool {
    face_confidence.is_some_and(|confidence| confidence >= minimum)
}

/// A face counts as frontal when both eyes are known and are more than
/// `threshold` pixels apart horizontally.
pub fn is_frontal(left_eye: Option<Point>, right_eye: Option<Point>, threshold: f64) -> bool {
    match (left_eye, right_eye) {
        (Some(left), Some(right)) => (left.0 - right.0).abs() > threshold,
        _ => false,
    }
}

/// Read an eye landmark from its raw JSON form.
///
/// `Ok(None)` means the landmark is absent (missing or `null`).
pub fn eye_point(landmark: Option<&Value>) -> Result<Option<Point>, String> {
    let Some(landmark) = landmark.filter(|value| !value.is_null()) else {
        return Ok(None);
    };
    let Some(pair) = landmark.as_array() else {
        return Err(format!("expected [x, y], got {landmark}"));
    };
    match pair.as_slice() {
        [x, y] => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Some((x, y))),
            _ => Err(format!("non-numeric coordinates in {landmark}")),
        },
        _ => Err(format!("expected 2 coordinates, got {}", pair.len())),
    }
}

/// Apply the frontal-pose rule to a region's eye landmarks.
pub fn check_frontal(region: &FaceRegion, threshold: f64) -> Result<(), RejectReason> {
    let left = eye_point(region.left_eye.as_ref()).map_err(RejectReason::MalformedEyes)?;
    let right = eye_point(region.right_eye.as_ref()).map_err(RejectReason::MalformedEyes)?;
    let (Some(left), Some(right)) = (left, right) else {
        return Err(RejectReason::MissingEyes);
    };

    if is_frontal(Some(left), Some(right), threshold) {
        Ok(())
    } else {
        Err(RejectReason::NotFrontal {
            eye_distance: (left.0 - right.0).abs(),
        })
    }
}

/// Pick the winning label of `scores` and map it onto `C`.
///
/// # Errors
///
/// Returns [`FaceCaptureError::UnknownCategory`] when the winning label is
/// not part of `C`, or when `scores` is empty.
pub fn resolve_category<C: Category>(scores: &AttributeScores) -> Result<(C, f64), FaceCaptureError> {
    let Some((label, confidence)) = scores.best() else {
        return Err(FaceCaptureError::UnknownCategory {
            kind: C::KIND,
            label: String::new(),
        });
    };
    Ok((C::from_label(label)?, confidence))
}

/// Run the confidence, pose and attribute rules on one face.
///
/// Crop geometry is checked separately by [`CropBox::for_face`] because it
/// needs the frame size.
///
/// # Errors
///
/// Only [`FaceCaptureError::UnknownCategory`].
pub fn evaluate_face(
    face: &FaceAnalysis,
    options: &CaptureOptions,
) -> Result<FaceVerdict, FaceCaptureError> {
    if !passes_confidence(face.face_confidence, options.min_face_confidence) {
        return Ok(FaceVerdict::Rejected(RejectReason::LowConfidence(
            face.face_confidence,
        )));
    }

    if let Some(region) = &face.region {
        if let Err(reason) = check_frontal(region, options.eye_diff_threshold) {
            return Ok(FaceVerdict::Rejected(reason));
        }
    }

    let (gender, gender_confidence) = resolve_category::<Gender>(&face.gender)?;
    let (race, race_confidence) = resolve_category::<Race>(&face.race)?;
    let (emotion, emotion_confidence) = resolve_category::<Emotion>(&face.emotion)?;

    Ok(FaceVerdict::Admitted(FaceAttributes {
        age: face.age,
        gender,
        race,
        emotion,
        gender_confidence,
        race_confidence,
        emotion_confidence,
    }))
}

/// A rectangle in frame pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl CropBox {
    /// The padded square around `region`, before clamping.
    ///
    /// The square side is the larger face dimension plus 30% padding on each
    /// side, centered on the region's center. A region whose geometry does
    /// not fit in `i64` is rejected as invalid.
    pub fn padded_square(region: &FaceRegion) -> Result<Self, RejectReason> {
        let FaceRegion { x, y, w, h, .. } = *region;
        let invalid = || RejectReason::InvalidRegion { w, h };
        if w <= 0 || h <= 0 {
            return Err(invalid());
        }

        let center_x = x.checked_add(w / 2).ok_or_else(invalid)?;
        let center_y = y.checked_add(h / 2).ok_or_else(invalid)?;
        let size = w.max(h);
        let padding = size.checked_mul(CROP_PADDING_PERCENT).ok_or_else(invalid)? / 100;
        let new_size = padding
            .checked_mul(2)
            .and_then(|both| both.checked_add(size))
            .ok_or_else(invalid)?;

        let left = center_x.checked_sub(new_size / 2).ok_or_else(invalid)?;
        let top = center_y.checked_sub(new_size / 2).ok_or_else(invalid)?;
        Ok(Self {
            left,
            top,
            right: left.checked_add(new_size).ok_or_else(invalid)?,
            bottom: top.checked_add(new_size).ok_or_else(invalid)?,
        })
    }

    /// Fit into a `width` × `height` frame. Fails when nothing is left.
    ///
    /// The leading edges are clamped to zero first and the box keeps its side
    /// length from there, so a face at the left or top border still gets a
    /// full-size crop when the frame is large enough.
    pub fn clamp_to(self, width: u32, height: u32) -> Result<Self, RejectReason> {
        let left = self.left.max(0);
        let top = self.top.max(0);
        let clamped = Self {
            left,
            top,
            right: left.saturating_add(self.width()).min(i64::from(width)),
            bottom: top.saturating_add(self.height()).min(i64::from(height)),
        };
        if clamped.is_empty() {
            Err(RejectReason::EmptyCrop)
        } else {
            Ok(clamped)
        }
    }

    /// The clamped crop for `face` in a `width` × `height` frame.
    pub fn for_face(face: &FaceAnalysis, width: u32, height: u32) -> Result<Self, RejectReason> {
        let region = face.region.as_ref().ok_or(RejectReason::NoRegion)?;
        Self::padded_square(region)?.clamp_to(width, height)
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}
