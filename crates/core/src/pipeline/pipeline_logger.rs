use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for highlight pipeline events.
///
/// Use cases report stage timings and counters here instead of printing,
/// so the CLI can summarise a run while tests stay silent.
pub trait PipelineLogger: Send {
    /// Report progress through a stage's work items (blocks, candidates).
    fn progress(&mut self, stage: &str, current: usize, total: usize);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. chunk count, failed blocks).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _stage: &str, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: forwards messages to `log` and keeps per-stage timings and
/// metrics for a closing summary.
pub struct StdoutPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Highlight pipeline summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let runs = durations.len();
            lines.push(format!("  {stage:14}: {total_ms:8.1}ms over {runs} run(s)"));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            if let Some(last) = self.metrics[name].last() {
                lines.push(format!("  {name}: {last}"));
            }
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

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, stage: &str, current: usize, total: usize) {
        if total > 0 {
            log::info!("{stage}: {current}/{total}");
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

/// Runs `f` and reports its wall time under `stage`.
pub fn timed<T>(logger: &mut dyn PipelineLogger, stage: &str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = f();
    logger.timing(stage, started.elapsed().as_secs_f64() * 1000.0);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress("semantic_score", 1, 10);
        logger.timing("chunk", 5.0);
        logger.metric("chunks", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new();
        logger.timing("chunk", 20.0);
        logger.timing("chunk", 30.0);
        logger.timing("select", 5.0);

        let chunk = logger.timings_for("chunk").unwrap();
        assert_eq!(chunk.len(), 2);
        assert!((chunk[1] - 30.0).abs() < f64::EPSILON);
        assert_eq!(logger.timings_for("select").unwrap().len(), 1);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new();
        logger.timing("rule_score", 2.0);
        logger.timing("edit", 1.0);
        logger.metric("failed_blocks", 1.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("rule_score"));
        assert!(summary.contains("edit"));
        assert!(summary.contains("failed_blocks: 1"));
        assert!(summary.contains("Highlight pipeline summary"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutPipelineLogger::new();
        logger.info("hello world");
        assert_eq!(logger.messages, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_timed_records_stage() {
        let mut logger = StdoutPipelineLogger::new();
        let value = timed(&mut logger, "fuse", || 7);
        assert_eq!(value, 7);
        assert_eq!(logger.timings_for("fuse").unwrap().len(), 1);
        assert!(logger.metrics_for("fuse").is_none());
    }
}
