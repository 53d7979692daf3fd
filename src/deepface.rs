//! HTTP adapter for a DeepFace-compatible analysis service.
//!
//! Frames are JPEG-encoded, sent as a base64 data URI to
//! `{endpoint}/analyze`, and the JSON answer is normalized by
//! [`parse_analysis_response`].
//!
//! ```no_run
//! use facecap::analysis::FaceAnalyzer;
//! use facecap::deepface::DeepFaceClient;
//!
//! let mut client = DeepFaceClient::new("http://127.0.0.1:5005")?;
//! let frame = image::RgbImage::new(640, 360);
//! let faces = client.analyze(&frame)?;
//! # Ok::<(), facecap::FaceCaptureError>(())
//! ```

use std::io::Cursor;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as base64_engine;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::analysis::{parse_analysis_response, FaceAnalysis, FaceAnalyzer, ANALYSIS_ACTIONS};
use crate::error::FaceCaptureError;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5005";
/// Face detector the service is asked to use.
pub const DEFAULT_DETECTOR_BACKEND: &str = "retinaface";

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Blocking client for the DeepFace `analyze` API.
#[derive(Debug, Clone)]
pub struct DeepFaceClient {
    client: Client,
    endpoint: String,
    detector_backend: String,
}

impl DeepFaceClient {
    /// Create a client for the service at `endpoint` (scheme, host, port).
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::AnalysisError`] if the HTTP client cannot
    /// be constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FaceCaptureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            detector_backend: DEFAULT_DETECTOR_BACKEND.to_string(),
        })
    }

    /// Ask the service for a different face detector.
    #[must_use]
    pub fn with_detector_backend(mut self, backend: impl Into<String>) -> Self {
        self.detector_backend = backend.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze", self.endpoint)
    }

    /// Build the JSON body of an `analyze` request for `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`FaceCaptureError::ImageError`] if JPEG encoding fails.
    pub fn request_body(&self, frame: &RgbImage) -> Result<Value, FaceCaptureError> {
        Ok(json!({
            "img": encode_data_uri(frame)?,
            "actions": ANALYSIS_ACTIONS,
            "enforce_detection": false,
            "detector_backend": self.detector_backend,
        }))
    }
}

impl FaceAnalyzer for DeepFaceClient {
    fn analyze(&mut self, frame: &RgbImage) -> Result<Vec<FaceAnalysis>, FaceCaptureError> {
        let body = self.request_body(frame)?;
        let url = self.analyze_url();
        log::debug!("POST {url} ({}x{} frame)", frame.width(), frame.height());

        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            if is_no_face_answer(&text) {
                return Ok(Vec::new());
            }
            return Err(FaceCaptureError::AnalysisError(format!(
                "service returned {status}: {text}"
            )));
        }

        let faces = parse_analysis_response(&text)?;
        log::debug!("Service found {} face(s)", faces.len());
        Ok(faces)
    }
}

/// JPEG-encode `frame` as a `data:image/jpeg;base64,` URI.
pub fn encode_data_uri(frame: &RgbImage) -> Result<String, FaceCaptureError> {
    let mut jpeg = Vec::new();
    frame.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        base64_engine.encode(&jpeg)
    ))
}

/// Whether an error body is the service's "no face found" answer.
fn is_no_face_answer(body: &str) -> bool {
    body.to_ascii_lowercase().contains("face could not be detected")
}

