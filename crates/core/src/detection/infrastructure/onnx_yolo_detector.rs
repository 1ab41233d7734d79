//! YOLO face-pose detector using ONNX Runtime via `ort`.
//!
//! One model serves both detection stages: over a full image it yields face
//! boxes, and over a face region it yields the eye keypoints of the dominant
//! face, which are turned into eye boxes.

use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::eye_detector::EyeDetector;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::load_session;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoint values per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// YOLO face detector backed by an ONNX Runtime session.
///
/// The session is guarded by a mutex so one loaded model can be shared
/// by all batch workers.
pub struct OnnxYoloDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("YOLO input size: {input_size}");

        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }

    /// Runs the model on `frame` and returns NMS-filtered detections in frame coordinates.
    fn infer(&self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let letterboxed = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(letterboxed.tensor)?;

        let mut dets = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| "YOLO session lock poisoned")?;
            let outputs = session.run(ort::inputs![input_value])?;
            if outputs.len() == 0 {
                return Err("YOLO model produced no outputs".into());
            }
            let tensor = outputs[0].try_extract_array::<f32>()?;
            let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
            parse_detections(data, tensor.shape(), self.confidence, &letterboxed.mapping)?
        };

        Ok(nms(&mut dets, NMS_IOU_THRESH))
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect_faces(&self, gray: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let faces: Vec<BoundingBox> = self
            .infer(gray)?
            .iter()
            .filter_map(|d| d.to_bounding_box(gray.width(), gray.height()))
            .collect();
        log::debug!("YOLO found {} faces", faces.len());
        Ok(faces)
    }
}

impl EyeDetector for OnnxYoloDetector {
    fn detect_eyes(&self, face: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        // NMS output is sorted by confidence; the first detection is the face itself.
        let eyes = self
            .infer(face)?
            .first()
            .and_then(|d| {
                d.keypoints
                    .map(|pts| FaceLandmarks::new(pts).eye_boxes(d.x2 - d.x1))
            })
            .unwrap_or_default();
        Ok(eyes)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Maps letterbox coordinates back onto the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxMapping {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxMapping {
    fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    mapping: LetterboxMapping,
}

/// Letterbox-resize a frame to `target_size` × `target_size` as an NCHW
/// float tensor. Grayscale frames are replicated across the three channels.
fn letterbox(frame: &Frame, target_size: u32) -> Letterboxed {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding filled with 114/255 gray, YOLO convention
    let fill = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), fill);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let last_channel = frame.channels() as usize - 1;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c.min(last_channel)]] as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        mapping: LetterboxMapping {
            scale,
            pad_x,
            pad_y,
        },
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    keypoints: Option<[(f64, f64); 5]>,
}

impl RawDetection {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Integer box clipped to the frame, or `None` if nothing remains.
    fn to_bounding_box(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
        let x1 = self.x1.max(0.0).floor() as i32;
        let y1 = self.y1.max(0.0).floor() as i32;
        let x2 = self.x2.min(frame_w as f64).ceil() as i32;
        let y2 = self.y2.min(frame_h as f64).ceil() as i32;
        (x2 > x1 && y2 > y1).then(|| BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Decodes a raw YOLO output tensor into detections above `confidence`.
///
/// Accepts both `[1, features, detections]` (transposed) and
/// `[1, detections, features]` layouts. Each feature row is
/// `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    mapping: &LetterboxMapping,
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
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(format!("YOLO output too small for shape {shape:?}").into());
    }

    let feature = |det: usize, f: usize| -> f64 {
        if transposed {
            data[f * num_dets + det] as f64
        } else {
            data[det * num_feats + f] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = feature(i, 4);
        if conf < confidence {
            continue;
        }

        let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
        let (x1, y1) = mapping.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = mapping.to_source(cx + w / 2.0, cy + h / 2.0);

        let keypoints = (num_feats >= 5 + NUM_KEYPOINT_VALUES).then(|| {
            let mut pts = [(0.0f64, 0.0f64); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if feature(i, base + 2) >= KEYPOINT_CONF_THRESH {
                    *pt = mapping.to_source(feature(i, base), feature(i, base + 1));
                }
                // else: stays (0.0, 0.0), treated as invisible by FaceLandmarks
            }
            pts
        });

        dets.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            keypoints,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let overlaps = keep
            .iter()
            .any(|k| bbox_iou(&k.corners(), &det.corners()) > iou_thresh);
        if !overlaps {
            keep.push(det.clone());
        }
    }
    keep
}

/// IoU between two boxes given as `[x1, y1, x2, y2]`.
fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
