use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::composition::domain::crop_composer::compose;
use crate::composition::domain::guide_overlay::{
    draw_boxes, draw_guide_lines, EYE_BOX_COLOR, FACE_BOX_COLOR,
};
use crate::detection::domain::eye_locator::EyeLocator;
use crate::detection::domain::focal_point::focal_point;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::aspect_ratio::AspectRatio;
use crate::shared::crop_rect::CropRect;
use crate::shared::point::Point;

/// Wall-clock milliseconds spent in each stage for one image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub decode_ms: f64,
    pub locate_ms: f64,
    pub compose_ms: f64,
    pub encode_ms: f64,
}

impl StageTimings {
    /// `(stage name, milliseconds)` pairs in pipeline order.
    pub fn stages(&self) -> [(&'static str, f64); 4] {
        [
            ("decode", self.decode_ms),
            ("locate", self.locate_ms),
            ("compose", self.compose_ms),
            ("encode", self.encode_ms),
        ]
    }
}

/// What happened to one image.
#[derive(Clone, Debug, PartialEq)]
pub struct RecomposeOutcome {
    pub crop: CropRect,
    pub focal: Point,
    pub eyes_found: usize,
    pub timings: StageTimings,
}

/// Single-image pipeline: read → locate eyes → focal point → compose →
/// crop → [overlay] → write.
///
/// Holds only shared, read-only collaborators, so one instance can serve
/// every batch worker.
pub struct RecomposeImageUseCase {
    reader: Arc<dyn ImageReader>,
    writer: Arc<dyn ImageWriter>,
    locator: EyeLocator,
    aspect: AspectRatio,
    debug: bool,
}

impl RecomposeImageUseCase {
    pub fn new(
        reader: Arc<dyn ImageReader>,
        writer: Arc<dyn ImageWriter>,
        locator: EyeLocator,
        aspect: AspectRatio,
        debug: bool,
    ) -> Self {
        Self {
            reader,
            writer,
            locator,
            aspect,
            debug,
        }
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    pub fn execute(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<RecomposeOutcome, Box<dyn std::error::Error>> {
        let mut timings = StageTimings::default();

        let t0 = Instant::now();
        let mut frame = self.reader.read(input_path)?;
        timings.decode_ms = elapsed_ms(t0);

        let t0 = Instant::now();
        let detections = self.locator.detect(&frame)?;
        let eyes = detections.eye_centers();
        timings.locate_ms = elapsed_ms(t0);

        let t0 = Instant::now();
        let focal = focal_point(&eyes, frame.width(), frame.height());
        let crop = compose(frame.width(), frame.height(), focal, self.aspect);
        timings.compose_ms = elapsed_ms(t0);
        log::debug!(
            "{}: {} eyes, focal ({:.1}, {:.1}), crop {crop:?}",
            input_path.display(),
            eyes.len(),
            focal.x,
            focal.y
        );

        if self.debug {
            draw_boxes(&mut frame, &detections.faces, FACE_BOX_COLOR);
            draw_boxes(&mut frame, &detections.eyes, EYE_BOX_COLOR);
        }
        let mut cropped = frame.crop(&crop);
        if self.debug {
            let local = Point::new(focal.x - crop.left as f64, focal.y - crop.top as f64);
            draw_guide_lines(&mut cropped, Some(local));
        }

        let t0 = Instant::now();
        self.writer.write(output_path, &cropped)?;
        timings.encode_ms = elapsed_ms(t0);

        Ok(RecomposeOutcome {
            crop,
            focal,
            eyes_found: eyes.len(),
            timings,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::composition::domain::guide_overlay::{FOCAL_COLOR, THIRDS_COLOR};
    use crate::detection::domain::eye_detector::EyeDetector;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    // --- Stubs ---

    /// Serves black RGB frames of a fixed size per path; unknown paths fail.
    pub(crate) struct StubImageReader {
        sizes: HashMap<PathBuf, (u32, u32)>,
    }

    impl StubImageReader {
        pub(crate) fn new(entries: &[(&Path, (u32, u32))]) -> Self {
            Self {
                sizes: entries
                    .iter()
                    .map(|(p, s)| (p.to_path_buf(), *s))
                    .collect(),
            }
        }
    }

    impl ImageReader for StubImageReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            let (w, h) = self
                .sizes
                .get(path)
                .ok_or_else(|| format!("cannot decode {}", path.display()))?;
            Ok(Frame::new(vec![0; (w * h * 3) as usize], *w, *h, 3))
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingImageWriter {
        pub(crate) written: Mutex<Vec<(PathBuf, Frame)>>,
    }

    impl ImageWriter for RecordingImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct FailingImageWriter;

    impl ImageWriter for FailingImageWriter {
        fn write(&self, _path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    pub(crate) struct FixedFaceDetector(pub(crate) Vec<BoundingBox>);

    impl FaceDetector for FixedFaceDetector {
        fn detect_faces(&self, _gray: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) struct FixedEyeDetector(pub(crate) Vec<BoundingBox>);

    impl EyeDetector for FixedEyeDetector {
        fn detect_eyes(&self, _face: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn locator(faces: Vec<BoundingBox>, eyes: Vec<BoundingBox>) -> EyeLocator {
        EyeLocator::new(
            Arc::new(FixedFaceDetector(faces)),
            Arc::new(FixedEyeDetector(eyes)),
        )
    }

    /// One face at the origin with two ROI-local eye boxes centred at
    /// (450, 300) and (550, 300).
    fn two_eyes() -> EyeLocator {
        locator(
            vec![BoundingBox::new(0, 0, 1000, 1000)],
            vec![
                BoundingBox::new(440, 290, 20, 20),
                BoundingBox::new(540, 290, 20, 20),
            ],
        )
    }

    fn use_case(
        size: (u32, u32),
        locator: EyeLocator,
        writer: Arc<dyn ImageWriter>,
        debug: bool,
    ) -> RecomposeImageUseCase {
        RecomposeImageUseCase::new(
            Arc::new(StubImageReader::new(&[(Path::new("in.jpg"), size)])),
            writer,
            locator,
            AspectRatio::default(),
            debug,
        )
    }

    // --- Tests ---

    #[test]
    fn test_crop_centered_on_eyes() {
        let writer = Arc::new(RecordingImageWriter::default());
        let uc = use_case((1000, 1000), two_eyes(), writer.clone(), false);

        let outcome = uc.execute(Path::new("in.jpg"), Path::new("out.jpg")).unwrap();

        assert_eq!(outcome.eyes_found, 2);
        assert_relative_eq!(outcome.focal.x, 500.0);
        assert_relative_eq!(outcome.focal.y, 300.0);
        // above bound 900 wins over width bound 1250 and below bound 1050
        assert_eq!(
            outcome.crop,
            CropRect {
                left: 140,
                top: 0,
                right: 860,
                bottom: 900,
            }
        );

        let written = writer.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out.jpg"));
        assert_eq!((written[0].1.width(), written[0].1.height()), (720, 900));
    }

    #[test]
    fn test_no_eyes_falls_back_to_image_center() {
        let writer = Arc::new(RecordingImageWriter::default());
        let uc = use_case((800, 600), locator(vec![], vec![]), writer.clone(), false);

        let outcome = uc.execute(Path::new("in.jpg"), Path::new("out.jpg")).unwrap();

        assert_eq!(outcome.eyes_found, 0);
        assert_eq!(outcome.focal, Point::new(400.0, 300.0));
        // 4:5 with below bound 450 → 360x450
        assert_eq!(outcome.crop.height(), 450);
        assert_eq!(outcome.crop.width(), 360);
        assert_eq!(writer.written.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_output_is_plain_crop_without_debug() {
        let writer = Arc::new(RecordingImageWriter::default());
        let uc = use_case((1000, 1000), two_eyes(), writer.clone(), false);

        uc.execute(Path::new("in.jpg"), Path::new("out.jpg")).unwrap();

        let written = writer.written.lock().unwrap();
        assert!(written[0].1.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_debug_draws_guides_on_output() {
        let writer = Arc::new(RecordingImageWriter::default());
        let uc = use_case((1000, 1000), two_eyes(), writer.clone(), true);

        let outcome = uc.execute(Path::new("in.jpg"), Path::new("out.jpg")).unwrap();

        let written = writer.written.lock().unwrap();
        let arr = written[0].1.as_ndarray();
        let w = outcome.crop.width() as usize;
        // vertical thirds line at w / 3, away from the focal cross
        let x = w / 3;
        assert_eq!(
            [arr[[10, x, 0]], arr[[10, x, 1]], arr[[10, x, 2]]],
            THIRDS_COLOR
        );
        // focal cross passes through the focal point inside the crop
        let fx = (outcome.focal.x - outcome.crop.left as f64) as usize;
        assert_eq!(
            [arr[[10, fx, 0]], arr[[10, fx, 1]], arr[[10, fx, 2]]],
            FOCAL_COLOR
        );
    }

    #[test]
    fn test_timings_reported_for_every_stage() {
        let uc = use_case(
            (100, 100),
            two_eyes(),
            Arc::new(RecordingImageWriter::default()),
            false,
        );

        let outcome = uc.execute(Path::new("in.jpg"), Path::new("out.jpg")).unwrap();

        let names: Vec<_> = outcome.timings.stages().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["decode", "locate", "compose", "encode"]);
        assert!(outcome.timings.stages().iter().all(|(_, ms)| *ms >= 0.0));
    }

    #[test]
    fn test_decode_error_propagates_without_writing() {
        let writer = Arc::new(RecordingImageWriter::default());
        let uc = use_case((100, 100), two_eyes(), writer.clone(), false);

        let err = uc
            .execute(Path::new("missing.jpg"), Path::new("out.jpg"))
            .unwrap_err();

        assert!(err.to_string().contains("cannot decode"));
        assert!(writer.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_error_propagates() {
        let uc = use_case((100, 100), two_eyes(), Arc::new(FailingImageWriter), false);
        let err = uc
            .execute(Path::new("in.jpg"), Path::new("out.jpg"))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
