use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for batch orchestration events.
///
/// Use cases report through this trait instead of printing, so the CLI and
/// tests can decide what to surface.
pub trait PipelineLogger: Send {
    /// Report image-level progress after an image completes.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. eyes found per image).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-batch summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger for the CLI: forwards messages to `log`, throttles progress lines
/// to every `throttle_images` images, and accumulates per-stage timings for
/// the closing summary.
pub struct StdoutPipelineLogger {
    throttle_images: usize,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    completed: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_images: usize) -> Self {
        Self {
            throttle_images: throttle_images.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            completed: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let images = self.completed;
        let mut lines = vec![format!(
            "Batch summary ({images} images, {elapsed_s:.1}s total):"
        )];

        // Stage times are summed across workers, so they can exceed wall time.
        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  total {total_ms:7.0}ms",
                mean(durations)
            ));
        }

        for (name, values) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", mean(values)));
        }

        if images > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} images/s",
                images as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.completed = current;
        if total > 0 && (current % self.throttle_images == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processed {current}/{total} images ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
