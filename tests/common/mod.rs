//! In-memory stand-ins for the video and the face-analysis service.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::ops::ControlFlow;

use facecap::{
    AttributeScores, DecodedFrame, FaceAnalysis, FaceAnalyzer, FaceCaptureError, FaceRegion,
    VideoSource,
};
use image::{Rgb, RgbImage};

/// A synthetic video with a fixed keyframe layout.
pub struct FakeVideo {
    pub frame_rate: u32,
    pub total_frames: u64,
    pub keyframes: BTreeSet<u64>,
    pub frame_size: (u32, u32),
    /// Frames whose `read_frame` fails.
    pub unreadable: BTreeSet<u64>,
    /// The scan fails once it reaches this frame.
    pub scan_fails_at: Option<u64>,
    /// Frames handed to the scan handler so far.
    pub scanned: u64,
    /// Frames requested through `read_frame`, in order.
    pub reads: Vec<u64>,
}

impl FakeVideo {
    pub fn new(frame_rate: u32, total_frames: u64) -> Self {
        Self {
            frame_rate,
            total_frames,
            keyframes: BTreeSet::new(),
            frame_size: (640, 360),
            unreadable: BTreeSet::new(),
            scan_fails_at: None,
            scanned: 0,
            reads: Vec::new(),
        }
    }

    /// A keyframe every `interval` frames, starting at frame 0.
    pub fn with_keyframe_interval(mut self, interval: u64) -> Self {
        self.keyframes = (0..self.total_frames).step_by(interval as usize).collect();
        self
    }

    pub fn with_keyframes(mut self, keyframes: &[u64]) -> Self {
        self.keyframes = keyframes.iter().copied().collect();
        self
    }
}

impl VideoSource for FakeVideo {
    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn scan_frames<F>(&mut self, mut handler: F) -> Result<(), FaceCaptureError>
    where
        F: FnMut(DecodedFrame) -> ControlFlow<()>,
    {
        for index in 0..self.total_frames {
            if self.scan_fails_at == Some(index) {
                return Err(FaceCaptureError::VideoDecodeError(format!(
                    "corrupt packet at frame {index}"
                )));
            }
            self.scanned += 1;
            let frame = DecodedFrame {
                index,
                is_keyframe: self.keyframes.contains(&index),
            };
            if handler(frame).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn read_frame(&mut self, frame_number: u64) -> Result<RgbImage, FaceCaptureError> {
        self.reads.push(frame_number);
        if self.unreadable.contains(&frame_number) {
            return Err(FaceCaptureError::VideoDecodeError(format!(
                "cannot seek to frame {frame_number}"
            )));
        }
        let (width, height) = self.frame_size;
        Ok(RgbImage::from_pixel(width, height, Rgb([90, 120, 150])))
    }
}

/// Answers each `analyze` call with the next scripted response. Once the
/// script runs out, frames have no faces.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    pub responses: VecDeque<Result<Vec<FaceAnalysis>, FaceCaptureError>>,
    pub calls: usize,
}

impl ScriptedAnalyzer {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<FaceAnalysis>, FaceCaptureError>>,
    {
        Self {
            responses: responses.into_iter().collect(),
            calls: 0,
        }
    }
}

impl FaceAnalyzer for ScriptedAnalyzer {
    fn analyze(&mut self, _frame: &RgbImage) -> Result<Vec<FaceAnalysis>, FaceCaptureError> {
        self.calls += 1;
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A confident, frontal face inside a 640x360 frame.
pub fn frontal_face() -> FaceAnalysis {
    FaceAnalysis {
        region: Some(FaceRegion::new(100, 100, 40, 60).with_eyes((135.0, 120.0), (75.0, 120.0))),
        face_confidence: Some(0.99),
        age: 31.0,
        gender: AttributeScores::new([("Woman", 97.5), ("Man", 2.5)]),
        race: AttributeScores::new([
            ("asian", 88.0),
            ("indian", 2.0),
            ("black", 1.0),
            ("white", 6.0),
            ("middle eastern", 1.0),
            ("latino hispanic", 2.0),
        ]),
        emotion: AttributeScores::new([
            ("angry", 1.0),
            ("disgust", 0.0),
            ("fear", 1.0),
            ("happy", 80.0),
            ("sad", 3.0),
            ("surprise", 5.0),
            ("neutral", 10.0),
        ]),
    }
}

pub fn face_with_confidence(confidence: Option<f64>) -> FaceAnalysis {
    FaceAnalysis {
        face_confidence: confidence,
        ..frontal_face()
    }
}

pub fn face_with_region(region: Option<FaceRegion>) -> FaceAnalysis {
    FaceAnalysis {
        region,
        ..frontal_face()
    }
}
