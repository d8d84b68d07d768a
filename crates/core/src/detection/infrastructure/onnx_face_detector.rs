//! YOLO-pose face detector using ONNX Runtime via `ort`.
//!
//! Letterbox preprocessing, inference, confidence filtering and NMS. The
//! model's five keypoints become eye, nose-base and mouth-corner landmarks.
//! The model has no attribute head, so eye-open and smiling probabilities
//! are never computed, even when classification is requested.
use std::path::Path;

use crate::detection::domain::detection_request::AccuracyMode;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::face_record::FaceRecord;
use crate::shared::pixel_buffer::{ChannelOrder, PixelBuffer};

use super::math::{bbox_area, bbox_iou};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const FAST_CONFIDENCE: f64 = 0.5;
pub const ACCURATE_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoint values per detection (5 landmarks × x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

pub struct OnnxFaceDetector {
    /// `None` once released, or when the model could not be loaded.
    session: Option<ort::session::Session>,
    options: DetectorOptions,
    input_size: u32,
}

impl OnnxFaceDetector {
    /// Load the model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 when dynamic.
    pub fn load(
        model_path: &Path,
        options: DetectorOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session: Some(session),
            options,
            input_size,
        })
    }

    /// A detector with no model behind it. Never operational.
    pub fn unavailable(options: DetectorOptions) -> Self {
        Self {
            session: None,
            options,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }

    fn confidence(&self) -> f64 {
        confidence_for(self.options.mode)
    }
}

pub fn confidence_for(mode: AccuracyMode) -> f64 {
    match mode {
        AccuracyMode::Fast => FAST_CONFIDENCE,
        AccuracyMode::Accurate => ACCURATE_CONFIDENCE,
    }
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn is_operational(&self) -> bool {
        self.session.is_some()
    }

    fn detect(
        &mut self,
        image: &PixelBuffer,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
        if image.order() != ChannelOrder::Rgba {
            return Err("detector expects RGBA pixels".into());
        }
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        let confidence = self.confidence();
        let input_size = self.input_size;
        let session = self.session.as_mut().ok_or("detector has been released")?;

        let (input_tensor, letterbox) = letterbox(image, input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_detections(data, &shape, confidence, &letterbox)?;
        let mut kept = nms(&mut raw, NMS_IOU_THRESH);

        if self.options.prominent_face_only {
            kept = prominent(kept).into_iter().collect();
        }

        Ok(kept.into_iter().map(RawDetection::into_face_record).collect())
    }

    fn release(&mut self) {
        self.session = None;
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to the source image.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_image(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize an RGBA image to `target_size` × `target_size`.
///
/// Returns an NCHW float32 RGB tensor normalized to [0, 1].
fn letterbox(image: &PixelBuffer, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = image.width() as f64;
    let fh = image.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = image.color_view(); // [H, W, 3] u8
    let src_h = image.height() as usize;
    let src_w = image.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: [f64; 4],
    confidence: f64,
    keypoints: Option<[(f64, f64); 5]>,
}

impl RawDetection {
    fn into_face_record(self) -> FaceRecord {
        let [x1, y1, x2, y2] = self.bbox;
        let mut face = FaceRecord::new(x1 as f32, y1 as f32, (x2 - x1) as f32, (y2 - y1) as f32);
        if let Some(points) = self.keypoints {
            face.landmarks = FaceLandmarks::new(points).to_landmarks();
        }
        face
    }
}

/// Parse raw YOLO output into image-space detections above `confidence`.
///
/// Output is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; rows are
/// `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    letterbox: &Letterbox,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err("YOLO output shorter than its shape".into());
    }

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let row: Vec<f32> = if transposed {
            (0..num_feats).map(|f| data[f * num_dets + i]).collect()
        } else {
            data[i * num_feats..(i + 1) * num_feats].to_vec()
        };

        if row.len() < 5 {
            continue;
        }
        let conf = row[4] as f64;
        if conf < confidence {
            continue;
        }

        let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
        let (x1, y1) = letterbox.to_image(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_image(cx + w / 2.0, cy + h / 2.0);

        let keypoints = if row.len() >= 5 + NUM_KEYPOINT_VALUES {
            let mut pts = [(0.0f64, 0.0f64); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let kconf = row[5 + k * 3 + 2] as f64;
                if kconf >= KEYPOINT_CONF_THRESH {
                    *pt = letterbox.to_image(row[5 + k * 3] as f64, row[5 + k * 3 + 1] as f64);
                }
                // else: stays (0.0, 0.0), treated as invisible by FaceLandmarks
            }
            Some(pts)
        } else {
            None
        };

        dets.push(RawDetection {
            bbox: [x1, y1, x2, y2],
            confidence: conf,
            keypoints,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

/// The largest detection; ties go to the earlier (more confident) one.
fn prominent(dets: Vec<RawDetection>) -> Option<RawDetection> {
    dets.into_iter().fold(None, |best: Option<RawDetection>, d| match best {
        Some(b) if bbox_area(&b.bbox) >= bbox_area(&d.bbox) => Some(b),
        _ => Some(d),
    })
}
