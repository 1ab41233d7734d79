use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::recompose_image_use_case::{RecomposeImageUseCase, RecomposeOutcome};
use crate::shared::aspect_ratio::AspectRatio;
use crate::shared::constants::IMAGE_EXTENSIONS;

/// Jobs queued per worker before the feeder blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// A finished job with its outcome or stringified error.
type Completed = (RecomposeJob, Result<RecomposeOutcome, String>);

/// One image to recompose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecomposeJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedImage {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: RecomposeOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedImage {
    pub input: PathBuf,
    pub error: String,
}

/// Result of a batch run, sorted by input path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub processed: Vec<ProcessedImage>,
    pub failed: Vec<FailedImage>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    fn sort(&mut self) {
        self.processed.sort_by(|a, b| a.input.cmp(&b.input));
        self.failed.sort_by(|a, b| a.input.cmp(&b.input));
    }
}

/// Recomposes every image under an input tree, mirroring its folder
/// structure below the output root.
///
/// Layout: `feeder → [worker × N] → main (progress + report)`
///
/// Workers share one [`RecomposeImageUseCase`], and with it one detector.
/// A failing image is recorded in the report and does not stop the batch.
pub struct BatchRecomposeUseCase {
    recompose: Arc<RecomposeImageUseCase>,
    workers: usize,
    logger: Box<dyn PipelineLogger>,
}

impl BatchRecomposeUseCase {
    pub fn new(
        recompose: Arc<RecomposeImageUseCase>,
        workers: usize,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            recompose,
            workers: workers.max(1),
            logger,
        }
    }

    /// Processes `input` (a directory tree or a single image) into
    /// `output_root`.
    ///
    /// Fails only when the input cannot be listed; per-image errors land in
    /// the report.
    pub fn execute(
        &mut self,
        input: &Path,
        output_root: &Path,
    ) -> Result<BatchReport, Box<dyn std::error::Error>> {
        let jobs = plan_jobs(input, output_root, self.recompose.aspect())?;
        let total = jobs.len();
        if total == 0 {
            self.logger
                .info(&format!("No images found in {}", input.display()));
            return Ok(BatchReport::default());
        }

        let workers = self.workers.min(total);
        self.logger.info(&format!(
            "Recomposing {total} images with {workers} worker(s)"
        ));

        let report = self.run_pool(jobs, workers);
        self.logger.summary();
        Ok(report)
    }

    fn run_pool(&mut self, jobs: Vec<RecomposeJob>, workers: usize) -> BatchReport {
        let total = jobs.len();
        let (job_tx, job_rx) =
            crossbeam_channel::bounded::<RecomposeJob>(workers * QUEUE_DEPTH_PER_WORKER);
        let (done_tx, done_rx) =
            crossbeam_channel::bounded::<Completed>(workers * QUEUE_DEPTH_PER_WORKER);

        let feeder = std::thread::spawn(move || {
            for job in jobs {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        let handles: Vec<_> = (0..workers)
            .map(|_| spawn_worker(self.recompose.clone(), job_rx.clone(), done_tx.clone()))
            .collect();
        drop(job_rx);
        drop(done_tx);

        let mut report = BatchReport::default();
        let started = Instant::now();
        for (job, result) in done_rx {
            match result {
                Ok(outcome) => {
                    for (stage, ms) in outcome.timings.stages() {
                        self.logger.timing(stage, ms);
                    }
                    self.logger.metric("eyes", outcome.eyes_found as f64);
                    report.processed.push(ProcessedImage {
                        input: job.input,
                        output: job.output,
                        outcome,
                    });
                }
                Err(error) => {
                    log::warn!("Skipping {}: {error}", job.input.display());
                    report.failed.push(FailedImage {
                        input: job.input,
                        error,
                    });
                }
            }
            self.logger.progress(report.total(), total);
        }

        if feeder.join().is_err() {
            log::error!("Job feeder thread panicked");
        }
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }

        log::debug!(
            "Batch finished in {:.1}s: {} ok, {} failed",
            started.elapsed().as_secs_f64(),
            report.processed.len(),
            report.failed.len()
        );
        report.sort();
        report
    }
}

fn spawn_worker(
    recompose: Arc<RecomposeImageUseCase>,
    job_rx: crossbeam_channel::Receiver<RecomposeJob>,
    done_tx: crossbeam_channel::Sender<Completed>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let result = recompose
                .execute(&job.input, &job.output)
                .map_err(|e| e.to_string());
            if done_tx.send((job, result)).is_err() {
                break;
            }
        }
    })
}

/// Pairs every image under `input` with its output path.
///
/// A single-file `input` yields one job written directly into `output_root`.
pub fn plan_jobs(
    input: &Path,
    output_root: &Path,
    aspect: AspectRatio,
) -> Result<Vec<RecomposeJob>, Box<dyn std::error::Error>> {
    if input.is_file() {
        let parent = input.parent().unwrap_or(Path::new(""));
        return Ok(vec![RecomposeJob {
            input: input.to_path_buf(),
            output: output_path_for(parent, input, output_root, aspect),
        }]);
    }

    let mut images = Vec::new();
    scan_images(input, &mut images)?;
    images.sort();
    Ok(images
        .into_iter()
        .map(|path| RecomposeJob {
            output: output_path_for(input, &path, output_root, aspect),
            input: path,
        })
        .collect())
}

/// Recursively collects image files under `dir`.
fn scan_images(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_images(&path, found)?;
        } else if is_image_file(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// True when the extension (any case) is a supported raster format.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// `output_root / <dir of input relative to input_root> / "{W}x{H}_{name}"`.
pub fn output_path_for(
    input_root: &Path,
    input: &Path,
    output_root: &Path,
    aspect: AspectRatio,
) -> PathBuf {
    let relative_dir = input
        .strip_prefix(input_root)
        .ok()
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_root
        .join(relative_dir)
        .join(format!("{}{name}", aspect.file_prefix()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::domain::crop_composer::compose;
    use crate::imaging::domain::image_writer::ImageWriter;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::recompose_image_use_case::tests::{
        locator, RecordingImageWriter, StubImageReader,
    };
    use crate::shared::point::Point;
    use rstest::rstest;
    use std::sync::Mutex;

    // --- Helpers ---

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"").unwrap();
    }

    fn batch(
        readable: &[&Path],
        writer: Arc<dyn ImageWriter>,
        workers: usize,
        logger: Box<dyn PipelineLogger>,
    ) -> BatchRecomposeUseCase {
        let entries: Vec<(&Path, (u32, u32))> = readable.iter().map(|p| (*p, (40, 50))).collect();
        let recompose = RecomposeImageUseCase::new(
            Arc::new(StubImageReader::new(&entries)),
            writer,
            locator(vec![], vec![]),
            AspectRatio::default(),
            false,
        );
        BatchRecomposeUseCase::new(Arc::new(recompose), workers, logger)
    }

    /// Records progress events for assertions.
    #[derive(Clone, Default)]
    struct RecordingLogger {
        progress: Arc<Mutex<Vec<(usize, usize)>>>,
        timings: Arc<Mutex<Vec<String>>>,
    }

    impl PipelineLogger for RecordingLogger {
        fn progress(&mut self, current: usize, total: usize) {
            self.progress.lock().unwrap().push((current, total));
        }
        fn timing(&mut self, stage: &str, _duration_ms: f64) {
            self.timings.lock().unwrap().push(stage.to_string());
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    // --- Path planning ---

    #[rstest]
    #[case("a.jpg", true)]
    #[case("a.JPG", true)]
    #[case("a.Jpeg", true)]
    #[case("a.png", true)]
    #[case("a.webp", true)]
    #[case("a.gif", false)]
    #[case("a.txt", false)]
    #[case("jpg", false)]
    fn test_is_image_file(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image_file(Path::new(name)), expected);
    }

    #[test]
    fn test_output_path_preserves_relative_dirs() {
        let out = output_path_for(
            Path::new("/in"),
            Path::new("/in/2024/june/portrait.jpg"),
            Path::new("/out"),
            AspectRatio::default(),
        );
        assert_eq!(out, PathBuf::from("/out/2024/june/4x5_portrait.jpg"));
    }

    #[test]
    fn test_output_path_uses_aspect_prefix() {
        let out = output_path_for(
            Path::new("/in"),
            Path::new("/in/p.png"),
            Path::new("/out"),
            AspectRatio::new(16, 9).unwrap(),
        );
        assert_eq!(out, PathBuf::from("/out/16x9_p.png"));
    }

    #[test]
    fn test_plan_jobs_walks_tree_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        touch(&input.join("b.jpg"));
        touch(&input.join("a.PNG"));
        touch(&input.join("notes.txt"));
        touch(&input.join("nested/deeper/c.jpeg"));
        let output = dir.path().join("out");

        let jobs = plan_jobs(&input, &output, AspectRatio::default()).unwrap();

        let outputs: Vec<_> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                output.join("4x5_a.PNG"),
                output.join("4x5_b.jpg"),
                output.join("nested/deeper/4x5_c.jpeg"),
            ]
        );
    }

    #[test]
    fn test_plan_jobs_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("face.jpg");
        touch(&input);

        let jobs = plan_jobs(&input, Path::new("/out"), AspectRatio::default()).unwrap();

        assert_eq!(
            jobs,
            vec![RecomposeJob {
                input,
                output: PathBuf::from("/out/4x5_face.jpg"),
            }]
        );
    }

    #[test]
    fn test_plan_jobs_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(plan_jobs(&missing, dir.path(), AspectRatio::default()).is_err());
    }

    // --- Execution ---

    #[rstest]
    #[case::single_worker(1)]
    #[case::more_workers_than_images(8)]
    fn test_every_image_processed(#[case] workers: usize) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let paths: Vec<PathBuf> = ["x.jpg", "y.jpg", "sub/z.png"]
            .iter()
            .map(|n| input.join(n))
            .collect();
        paths.iter().for_each(|p| touch(p));
        let readable: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let writer = Arc::new(RecordingImageWriter::default());
        let mut uc = batch(&readable, writer.clone(), workers, Box::new(NullPipelineLogger));

        let report = uc.execute(&input, &dir.path().join("out")).unwrap();

        assert_eq!(report.processed.len(), 3);
        assert!(report.failed.is_empty());
        let mut written: Vec<_> = writer
            .written
            .lock()
            .unwrap()
            .iter()
            .map(|(p, f)| (p.clone(), f.width(), f.height()))
            .collect();
        written.sort();
        // each 40x50 source is cropped around its center at 4:5
        let crop = compose(40, 50, Point::image_center(40, 50), AspectRatio::default());
        assert_eq!((crop.width(), crop.height()), (29, 37));
        let (w, h) = (crop.width(), crop.height());
        let out = dir.path().join("out");
        assert_eq!(
            written,
            vec![
                (out.join("4x5_x.jpg"), w, h),
                (out.join("4x5_y.jpg"), w, h),
                (out.join("sub/4x5_z.png"), w, h),
            ]
        );
    }

    #[test]
    fn test_failed_image_recorded_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let good = input.join("good.jpg");
        let bad = input.join("bad.jpg");
        touch(&good);
        touch(&bad);
        let mut uc = batch(
            &[good.as_path()],
            Arc::new(RecordingImageWriter::default()),
            2,
            Box::new(NullPipelineLogger),
        );

        let report = uc.execute(&input, &dir.path().join("out")).unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].input, good);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].input, bad);
        assert!(report.failed[0].error.contains("cannot decode"));
    }

    #[test]
    fn test_report_sorted_by_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let paths: Vec<PathBuf> = (0..12).map(|i| input.join(format!("{i:02}.jpg"))).collect();
        paths.iter().for_each(|p| touch(p));
        let readable: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut uc = batch(
            &readable,
            Arc::new(RecordingImageWriter::default()),
            4,
            Box::new(NullPipelineLogger),
        );

        let report = uc.execute(&input, &dir.path().join("out")).unwrap();

        let inputs: Vec<_> = report.processed.iter().map(|p| p.input.clone()).collect();
        assert_eq!(inputs, paths);
    }

    #[test]
    fn test_progress_reported_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let a = input.join("a.jpg");
        let b = input.join("b.jpg");
        touch(&a);
        touch(&b);
        let logger = RecordingLogger::default();
        let mut uc = batch(
            &[a.as_path(), b.as_path()],
            Arc::new(RecordingImageWriter::default()),
            2,
            Box::new(logger.clone()),
        );

        uc.execute(&input, &dir.path().join("out")).unwrap();

        assert_eq!(*logger.progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(logger.timings.lock().unwrap().len(), 8);
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        let writer = Arc::new(RecordingImageWriter::default());
        let mut uc = batch(&[], writer.clone(), 2, Box::new(NullPipelineLogger));

        let report = uc.execute(&input, &dir.path().join("out")).unwrap();

        assert_eq!(report.total(), 0);
        assert!(writer.written.lock().unwrap().is_empty());
    }
}
