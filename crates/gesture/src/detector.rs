//! ONNX face detector and hand-sign classifier

use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayViewD, Ix2, Ix3};
use ort::{GraphOptimizationLevel, Session};
use tracing::{debug, error, info};

use crate::adapter::{ClassificationResult, FaceDetector, HandSignClassifier};
use crate::config::{HandAreaConfig, ModelConfig};
use crate::geometry::BoundingBox;
use crate::postprocess::{decode_ssd, top_class};
use crate::vocabulary::SignVocabulary;
use crate::GestureError;

fn load_session(path: &str, what: &str) -> Result<Session, GestureError> {
    info!("Loading {} model from {}", what, path);
    Session::builder()
        .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|builder| builder.commit_from_file(path))
        .map_err(|e| {
            error!("Failed to load {} model: {}", what, e);
            GestureError::ModelLoad(format!("{}: {}", path, e))
        })
}

/// Resize to `size` x `size` and pack as a 1x3xHxW tensor in [0, 1]
fn to_nchw(frame: &VideoFrame, size: u32) -> Result<Array4<f32>, GestureError> {
    let img = frame.as_rgb_image().ok_or_else(|| {
        GestureError::Inference(format!("frame {} has a malformed pixel buffer", frame.sequence))
    })?;
    let resized = imageops::resize(&img, size, size, FilterType::Triangle);

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(input)
}

/// SSD-style face detector.
///
/// Expects two outputs: boxes `[1, N, 4]` as normalised
/// `[ymin, xmin, ymax, xmax]` and scores `[1, N]`.
pub struct OnnxFaceDetector {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
}

impl OnnxFaceDetector {
    pub fn new(config: &ModelConfig) -> Result<Self, GestureError> {
        let path = config
            .face_model_path
            .as_deref()
            .ok_or_else(|| GestureError::Config("face_model_path is not set".into()))?;

        Ok(Self {
            session: load_session(path, "face detection")?,
            input_size: config.face_input_size,
            confidence_threshold: config.face_confidence,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn name(&self) -> &str {
        "onnx-face"
    }

    fn detect(&mut self, frame: &VideoFrame, margin: u32) -> Result<Vec<BoundingBox>, GestureError> {
        let input = to_nchw(frame, self.input_size)?;
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| GestureError::Inference(e.to_string()))?)
            .map_err(|e| GestureError::Inference(e.to_string()))?;

        let boxes: ArrayViewD<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GestureError::Inference(e.to_string()))?;
        let scores: ArrayViewD<f32> = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| GestureError::Inference(e.to_string()))?;

        let boxes = boxes
            .into_dimensionality::<Ix3>()
            .map_err(|e| GestureError::Inference(format!("boxes output: {}", e)))?;
        let scores = scores
            .into_dimensionality::<Ix2>()
            .map_err(|e| GestureError::Inference(format!("scores output: {}", e)))?;

        let boxes: Vec<[f32; 4]> = boxes
            .outer_iter()
            .next()
            .map(|batch| {
                batch
                    .outer_iter()
                    .filter(|b| b.len() == 4)
                    .map(|b| [b[0], b[1], b[2], b[3]])
                    .collect()
            })
            .unwrap_or_default();
        let scores: Vec<f32> = scores
            .outer_iter()
            .next()
            .map(|batch| batch.iter().copied().collect())
            .unwrap_or_default();

        let faces = decode_ssd(
            &boxes,
            &scores,
            self.confidence_threshold,
            frame.width,
            frame.height,
            margin,
        );
        debug!("{} faces in frame {}", faces.len(), frame.sequence);
        Ok(faces)
    }
}

/// Softmax classifier over the sign vocabulary, applied to the hand area
/// beside a face.
pub struct OnnxHandSignClassifier {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
    hand_area: HandAreaConfig,
    labels: Vec<String>,
}

impl OnnxHandSignClassifier {
    pub fn new(config: &ModelConfig, vocabulary: &SignVocabulary) -> Result<Self, GestureError> {
        let path = config
            .classifier_model_path
            .as_deref()
            .ok_or_else(|| GestureError::Config("classifier_model_path is not set".into()))?;

        Ok(Self {
            session: load_session(path, "hand sign")?,
            input_size: config.classifier_input_size,
            confidence_threshold: config.classifier_confidence,
            hand_area: config.hand_area.clone(),
            labels: vocabulary.hand_signs.clone(),
        })
    }
}

impl HandSignClassifier for OnnxHandSignClassifier {
    fn name(&self) -> &str {
        "onnx-hand-sign"
    }

    fn classify(
        &mut self,
        frame: &VideoFrame,
        region: &BoundingBox,
    ) -> Result<Option<ClassificationResult>, GestureError> {
        let Some(hand_area) = self.hand_area.locate(region, frame.width, frame.height) else {
            return Ok(None);
        };
        let Some(crop) = hand_area
            .to_pixel_region(frame.width, frame.height)
            .and_then(|r| frame.crop(r))
        else {
            return Ok(None);
        };

        let input = to_nchw(&crop, self.input_size)?;
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| GestureError::Inference(e.to_string()))?)
            .map_err(|e| GestureError::Inference(e.to_string()))?;
        let probabilities: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GestureError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if probabilities.len() != self.labels.len() {
            return Err(GestureError::Inference(format!(
                "classifier produced {} classes, vocabulary has {}",
                probabilities.len(),
                self.labels.len()
            )));
        }

        Ok(top_class(&probabilities, self.confidence_threshold).map(|(class_index, p)| {
            debug!("Sign {} ({:.2}) in frame {}", self.labels[class_index], p, frame.sequence);
            ClassificationResult {
                hand_area,
                class_index,
                class_label: self.labels[class_index].clone(),
            }
        }))
    }
}
