use serde::Serialize;

use crate::errors::EvalmeError;

/// How the final report is rendered. Never mixed within one invocation:
/// `Json` emits exactly one document on stdout and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Immutable description of one benchmark: the sole input to both the
/// timing and the memory sampling pipelines.
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
    /// Shell-interpreted command line to benchmark.
    pub command: String,
    /// Number of timed runs and memory-sampled runs.
    pub runs: u32,
    /// Seconds between memory polls of the live process.
    pub interval_secs: f64,
    /// Warmup runs performed by the timing harness before measurement.
    pub warmup: Option<u32>,
    /// Command the harness executes before each timing run.
    pub prepare: Option<String>,
    /// Command the harness executes after all timing runs.
    pub cleanup: Option<String>,
    /// Echo the timing harness's raw output (text mode only).
    pub verbose: bool,
    pub output_mode: OutputMode,
}

impl BenchmarkRequest {
    pub fn new(command: impl Into<String>) -> Self {
        BenchmarkRequest {
            command: command.into(),
            runs: 10,
            interval_secs: 0.1,
            warmup: None,
            prepare: None,
            cleanup: None,
            verbose: false,
            output_mode: OutputMode::Text,
        }
    }

    /// Reject invalid run counts and intervals before any subprocess is
    /// spawned. A zero interval would make the poll loop spin; a zero run
    /// count would make every downstream count meaningless.
    pub fn validate(&self) -> Result<(), EvalmeError> {
        if self.runs < 1 {
            return Err(EvalmeError::InvalidRuns { runs: self.runs });
        }
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(EvalmeError::InvalidInterval {
                interval: self.interval_secs,
            });
        }
        Ok(())
    }
}

/// Per-command timing statistics as exported by the timing harness.
/// All durations are seconds. `times` holds one entry per timed run.
#[derive(Debug, Clone, Serialize)]
pub struct TimingStats {
    pub mean: f64,
    /// Absent when the harness performed a single run.
    pub stddev: Option<f64>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub user: f64,
    pub system: f64,
    pub times: Vec<f64>,
}

/// Summary of one raw memory sample sequence, in bytes.
///
/// A process that exits before the first poll tick contributes no samples,
/// so every summary field is optional: `None` means "no data", never zero.
/// `stddev` additionally requires at least two samples.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub count: usize,
    pub samples: Vec<u64>,
}

/// Resident and virtual memory summaries for one command.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub real: MemoryStats,
    #[serde(rename = "virtual")]
    pub virtual_mem: MemoryStats,
}

/// The final, immutable combination of timing and memory statistics for
/// one command. Created once both pipelines have completed successfully.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub command: String,
    pub timing: TimingStats,
    pub memory: MemoryUsage,
}

/// Wraps a string in single quotes, escaping internal single quotes as `'\''`.
pub fn shell_escape_single_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
