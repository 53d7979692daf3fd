//! Face-analysis data model and the service seam.
//!
//! A [`FaceAnalyzer`] turns one RGB frame into zero or more [`FaceAnalysis`]
//! records. The records mirror the DeepFace `analyze` wire format so that an
//! HTTP adapter can deserialize responses directly, while tests can build
//! them by hand.

use std::fmt::{Formatter, Result as FmtResult};

use image::RgbImage;
use serde::de::{Deserializer, Error as DeError, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::FaceCaptureError;

/// Attributes requested from the analysis service.
pub const ANALYSIS_ACTIONS: [&str; 4] = ["age", "gender", "race", "emotion"];

/// Bounding box of a detected face, in frame pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceRegion {
    #[serde(deserialize_with = "pixel_coordinate")]
    pub x: i64,
    #[serde(deserialize_with = "pixel_coordinate")]
    pub y: i64,
    #[serde(deserialize_with = "pixel_coordinate")]
    pub w: i64,
    #[serde(deserialize_with = "pixel_coordinate")]
    pub h: i64,
    /// Left eye landmark, normally `[x, y]`. Kept raw so that malformed
    /// landmarks can be told apart from missing ones.
    #[serde(default)]
    pub left_eye: Option<Value>,
    /// Right eye landmark, normally `[x, y]`.
    #[serde(default)]
    pub right_eye: Option<Value>,
}

impl FaceRegion {
    /// A region without eye landmarks.
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            left_eye: None,
            right_eye: None,
        }
    }

    /// Attach eye landmarks as `[x, y]` pairs.
    #[must_use]
    pub fn with_eyes(mut self, left: (f64, f64), right: (f64, f64)) -> Self {
        self.left_eye = Some(serde_json::json!([left.0, left.1]));
        self.right_eye = Some(serde_json::json!([right.0, right.1]));
        self
    }
}

/// Label → confidence mapping for one attribute, in the order the service
/// reported it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeScores(Vec<(String, f64)>);

impl AttributeScores {
    pub fn new<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(
            scores
                .into_iter()
                .map(|(label, score)| (label.into(), score))
                .collect(),
        )
    }

    /// The label with the highest score. On a tie the earliest label wins.
    pub fn best(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, score) in &self.0 {
            match best {
                Some((_, top)) if *score <= top => {}
                _ => best = Some((label.as_str(), *score)),
            }
        }
        best
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, score)| (label.as_str(), *score))
    }
}

impl<'de> Deserialize<'de> for AttributeScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = AttributeScores;

            fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str("a map of label to confidence")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
                let mut scores = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, score)) = map.next_entry::<String, f64>()? {
                    scores.push((label, score));
                }
                Ok(AttributeScores(scores))
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// One face found in one frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceAnalysis {
    /// Where the face is. Some detectors omit it.
    #[serde(default)]
    pub region: Option<FaceRegion>,
    /// Detector confidence in `[0, 1]`.
    #[serde(default)]
    pub face_confidence: Option<f64>,
    pub age: f64,
    #[serde(default)]
    pub gender: AttributeScores,
    #[serde(default)]
    pub race: AttributeScores,
    #[serde(default)]
    pub emotion: AttributeScores,
}

/// Detects faces in a frame and classifies their attributes.
pub trait FaceAnalyzer {
    /// Analyze `frame`. A frame without faces yields an empty vector.
    ///
    /// # Errors
    ///
    /// Any error is scoped to this frame: the capture loop logs it and moves
    /// on to the next keyframe.
    fn analyze(&mut self, frame: &RgbImage) -> Result<Vec<FaceAnalysis>, FaceCaptureError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnalysisResponse {
    Envelope { results: Vec<FaceAnalysis> },
    Many(Vec<FaceAnalysis>),
    One(FaceAnalysis),
}

/// Parse an `analyze` response body.
///
/// The service answers with a single face object, a list of them, or a
/// `{"results": [...]}` envelope depending on its version; all three are
/// normalized to a list.
///
/// # Errors
///
/// Returns [`FaceCaptureError::AnalysisError`] if the body matches none of
/// these shapes.
pub fn parse_analysis_response(body: &str) -> Result<Vec<FaceAnalysis>, FaceCaptureError> {
    let response: AnalysisResponse = serde_json::from_str(body).map_err(|error| {
        FaceCaptureError::AnalysisError(format!("unrecognized response ({error}): {body}"))
    })?;

    Ok(match response {
        AnalysisResponse::Envelope { results } => results,
        AnalysisResponse::Many(faces) => faces,
        AnalysisResponse::One(face) => vec![face],
    })
}

fn pixel_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|value| value as i64))
        .ok_or_else(|| D::Error::custom(format!("{number} is not a pixel coordinate")))
}
