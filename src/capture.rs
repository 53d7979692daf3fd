//! Face capture over the selected keyframes.
//!
//! For each keyframe the frame is read, analyzed, and every face that passes
//! [`evaluate_face`] is cropped to a padded square, resized and saved as a
//! JPEG. Problems with one face skip that face; problems with one frame skip
//! that frame. Only fatal errors (see [`FaceCaptureError::is_fatal`]) end the
//! loop early.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Serialize, Serializer};

use crate::admission::{evaluate_face, CropBox, FaceAttributes, FaceVerdict, RejectReason};
use crate::analysis::FaceAnalyzer;
use crate::category::{Category, Emotion, Gender, Race};
use crate::configuration::CaptureOptions;
use crate::error::FaceCaptureError;
use crate::progress::{OperationType, ProgressTracker};
use crate::video::VideoSource;

/// A face that passed admission and was written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedFace {
    /// Path of the saved avatar image.
    pub image_path: PathBuf,
    pub frame_number: u64,
    /// Position of the face in the frame's analysis results.
    pub face_index: usize,
    pub age: f64,
    #[serde(serialize_with = "display_name")]
    pub gender: Gender,
    #[serde(serialize_with = "display_name")]
    pub race: Race,
    #[serde(serialize_with = "display_name")]
    pub emotion: Emotion,
}

impl AcceptedFace {
    /// `(image_path, age, gender, race, emotion)` with display names.
    pub fn as_record(&self) -> (&Path, f64, &'static str, &'static str, &'static str) {
        (
            &self.image_path,
            self.age,
            self.gender.display_name(),
            self.race.display_name(),
            self.emotion.display_name(),
        )
    }
}

fn display_name<C: Category, S: Serializer>(category: &C, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.display_name())
}

/// File name of the avatar for face `face_index` of frame `frame_number`.
pub fn avatar_file_name(frame_number: u64, face_index: usize) -> String {
    format!("frame_{frame_number}_face_{face_index}.jpg")
}

/// Crop `crop` out of `frame` and resize it to `target_size`.
pub fn crop_avatar(frame: &RgbImage, crop: CropBox, target_size: (u32, u32)) -> RgbImage {
    let cropped = imageops::crop_imm(
        frame,
        crop.left as u32,
        crop.top as u32,
        crop.width() as u32,
        crop.height() as u32,
    )
    .to_image();
    imageops::resize(&cropped, target_size.0, target_size.1, FilterType::Lanczos3)
}

/// Capture faces from every frame in `keyframes`.
///
/// Avatars are written to `output_directory`, which must exist. The result
/// lists faces in frame order, then detection order.
///
/// # Errors
///
/// Returns the first fatal error raised while processing a frame. Everything
/// else is logged and skipped.
pub fn capture_faces<V, A>(
    video: &mut V,
    analyzer: &mut A,
    keyframes: &[u64],
    output_directory: &Path,
    options: &CaptureOptions,
) -> Result<Vec<AcceptedFace>, FaceCaptureError>
where
    V: VideoSource,
    A: FaceAnalyzer,
{
    let mut accepted = Vec::new();
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::FaceCapture,
        Some(keyframes.len() as u64),
        options.batch_size,
    );

    for &frame_number in keyframes {
        let frame = match video.read_frame(frame_number) {
            Ok(frame) => frame,
            Err(error) => {
                log::warn!("Cannot read frame {frame_number}: {error}");
                tracker.advance(Some(frame_number));
                continue;
            }
        };

        let outcome = capture_frame(
            analyzer,
            &frame,
            frame_number,
            output_directory,
            options,
            &mut accepted,
        );
        tracker.advance(Some(frame_number));

        if let Err(error) = outcome {
            if error.is_fatal() {
                return Err(error);
            }
            log::error!("Error while processing frame {frame_number}: {error}");
        }
    }
    tracker.finish();

    Ok(accepted)
}

fn capture_frame<A: FaceAnalyzer>(
    analyzer: &mut A,
    frame: &RgbImage,
    frame_number: u64,
    output_directory: &Path,
    options: &CaptureOptions,
    accepted: &mut Vec<AcceptedFace>,
) -> Result<(), FaceCaptureError> {
    let faces = analyzer.analyze(frame)?;
    if faces.is_empty() {
        log::info!("No face detected in frame {frame_number}");
        return Ok(());
    }

    for (face_index, face) in faces.iter().enumerate() {
        let attributes = match evaluate_face(face, options)? {
            FaceVerdict::Admitted(attributes) => attributes,
            FaceVerdict::Rejected(reason) => {
                log_rejection(frame_number, face_index, &reason);
                continue;
            }
        };
        log_attributes(frame_number, face_index, &attributes);

        let crop = match CropBox::for_face(face, frame.width(), frame.height()) {
            Ok(crop) => crop,
            Err(reason) => {
                log_rejection(frame_number, face_index, &reason);
                continue;
            }
        };

        let avatar = crop_avatar(frame, crop, options.target_size());
        let image_path = output_directory.join(avatar_file_name(frame_number, face_index));
        avatar.save(&image_path)?;
        log::info!("Saved face image to {}", image_path.display());

        accepted.push(AcceptedFace {
            image_path,
            frame_number,
            face_index,
            age: attributes.age,
            gender: attributes.gender,
            race: attributes.race,
            emotion: attributes.emotion,
        });
    }

    Ok(())
}

fn log_rejection(frame_number: u64, face_index: usize, reason: &RejectReason) {
    log::log!(
        reason.log_level(),
        "Skipping face {face_index} in frame {frame_number}: {reason}"
    );
}

fn log_attributes(frame_number: u64, face_index: usize, attributes: &FaceAttributes) {
    log::debug!(
        "Frame {frame_number} face {face_index}: age {}, gender {} ({:.2}%), race {} ({:.2}%), emotion {} ({:.2}%)",
        attributes.age,
        attributes.gender,
        attributes.gender_confidence,
        attributes.race,
        attributes.race_confidence,
        attributes.emotion,
        attributes.emotion_confidence,
    );
}
