use std::process::Command;

use anyhow::Result;
use serde::Deserialize;

use crate::errors::EvalmeError;
use crate::types::{BenchmarkRequest, OutputMode, TimingStats};

/// Environment variable overriding the timing harness binary. Primarily a
/// test seam; also lets users point at a pinned hyperfine build.
pub const HARNESS_ENV: &str = "EVALME_HYPERFINE";

const DEFAULT_HARNESS: &str = "hyperfine";

/// Capability for measuring a command's wall-clock timing. One call covers
/// the whole benchmark: the provider owns repetition and warmup policy.
pub trait TimingProvider {
    fn measure(&self, request: &BenchmarkRequest) -> Result<TimingStats>;
}

/// Adapter over the external `hyperfine` timing harness.
///
/// Builds a single harness invocation from the request's timing-relevant
/// fields and reads the statistics back through a JSON export file. The
/// export file is a `NamedTempFile`, so it is removed on every exit path,
/// including harness failure.
pub struct Hyperfine {
    program: String,
}

impl Hyperfine {
    pub fn from_env() -> Self {
        Hyperfine {
            program: std::env::var(HARNESS_ENV).unwrap_or_else(|_| DEFAULT_HARNESS.to_string()),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Hyperfine {
            program: program.into(),
        }
    }
}

/// Shape of hyperfine's `--export-json` document. Durations are seconds.
#[derive(Debug, Deserialize)]
struct HyperfineExport {
    results: Vec<HyperfineEntry>,
}

#[derive(Debug, Deserialize)]
struct HyperfineEntry {
    mean: f64,
    // Null when the harness performed a single run.
    stddev: Option<f64>,
    median: f64,
    user: f64,
    system: f64,
    min: f64,
    max: f64,
    times: Vec<f64>,
}

impl TimingProvider for Hyperfine {
    fn measure(&self, request: &BenchmarkRequest) -> Result<TimingStats> {
        request.validate()?;

        let export = tempfile::Builder::new()
            .prefix("evalme-")
            .suffix(".json")
            .tempfile()?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("--runs").arg(request.runs.to_string());
        if let Some(warmup) = request.warmup {
            cmd.arg("--warmup").arg(warmup.to_string());
        }
        if let Some(ref prepare) = request.prepare {
            cmd.arg("--prepare").arg(prepare);
        }
        if let Some(ref cleanup) = request.cleanup {
            cmd.arg("--cleanup").arg(cleanup);
        }
        // Plain output: the harness's progress bar emits control codes that
        // are useless in a captured stream.
        cmd.arg("--style").arg("basic");
        cmd.arg("--export-json").arg(export.path());
        cmd.arg(&request.command);

        let output = cmd
            .output()
            .map_err(|source| EvalmeError::SpawnFailure {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            // Do not attempt to parse the export: it may be absent or
            // half-written. The tempfile is still cleaned up on drop.
            return Err(EvalmeError::HarnessFailure {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }

        if request.verbose && request.output_mode == OutputMode::Text {
            eprint!("{}", String::from_utf8_lossy(&output.stdout));
        }

        let data = std::fs::read_to_string(export.path())?;
        parse_export(&data)
    }
}

fn parse_export(data: &str) -> Result<TimingStats> {
    let export: HyperfineExport =
        serde_json::from_str(data).map_err(|err| EvalmeError::MalformedHarnessOutput {
            detail: err.to_string(),
        })?;

    let entry = export
        .results
        .into_iter()
        .next()
        .ok_or_else(|| EvalmeError::MalformedHarnessOutput {
            detail: "empty results array".to_string(),
        })?;

    Ok(TimingStats {
        mean: entry.mean,
        stddev: entry.stddev,
        median: entry.median,
        min: entry.min,
        max: entry.max,
        user: entry.user,
        system: entry.system,
        times: entry.times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    const EXPORT_FIXTURE: &str = r#"{
      "results": [{
        "command": "sleep 1",
        "mean": 1.0021, "stddev": 0.0013, "median": 1.0019,
        "user": 0.0008, "system": 0.0021,
        "min": 1.0009, "max": 1.0042,
        "times": [1.0009, 1.0019, 1.0042],
        "exit_codes": [0, 0, 0]
      }]
    }"#;

    #[test]
    fn parse_export_extracts_all_fields() {
        let stats = parse_export(EXPORT_FIXTURE).unwrap();
        assert!((stats.mean - 1.0021).abs() < 1e-9);
        assert_eq!(stats.stddev, Some(0.0013));
        assert!((stats.median - 1.0019).abs() < 1e-9);
        assert!((stats.min - 1.0009).abs() < 1e-9);
        assert!((stats.max - 1.0042).abs() < 1e-9);
        assert_eq!(stats.times.len(), 3);
    }

    #[test]
    fn parse_export_tolerates_null_stddev() {
        let data = r#"{"results":[{"command":"true","mean":0.001,"stddev":null,
            "median":0.001,"user":0.0,"system":0.0,"min":0.001,"max":0.001,
            "times":[0.001]}]}"#;
        let stats = parse_export(data).unwrap();
        assert!(stats.stddev.is_none());
        assert_eq!(stats.times.len(), 1);
    }

    #[test]
    fn parse_export_rejects_empty_results() {
        let err = parse_export(r#"{"results":[]}"#).unwrap_err();
        assert!(err.to_string().contains("empty results array"));
    }

    #[test]
    fn parse_export_rejects_garbage() {
        assert!(parse_export("not json at all").is_err());
        assert!(parse_export(r#"{"results":[{"mean":"fast"}]}"#).is_err());
    }

    /// Write an executable fake harness script and return its path.
    fn write_fake_harness(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("fake-hyperfine");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Shell fragment that locates the value following --export-json.
    const FIND_EXPORT: &str = r#"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--export-json" ]; then out="$a"; fi
  prev="$a"
done
"#;

    #[test]
    fn measure_parses_successful_export() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let body = format!(
            "{FIND_EXPORT}\ncat > \"$out\" <<'EOF'\n{EXPORT_FIXTURE}\nEOF\n"
        );
        let harness = write_fake_harness(tmp.path(), &body);

        let provider = Hyperfine::with_program(harness.to_string_lossy());
        let mut req = BenchmarkRequest::new("sleep 1");
        req.runs = 3;
        let stats = provider.measure(&req).unwrap();
        assert!((stats.mean - 1.0021).abs() < 1e-9);
        assert_eq!(stats.times.len(), 3);
    }

    #[test]
    fn measure_surfaces_harness_failure() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let harness = write_fake_harness(tmp.path(), "echo 'no such command' >&2\nexit 7\n");

        let provider = Hyperfine::with_program(harness.to_string_lossy());
        let err = provider
            .measure(&BenchmarkRequest::new("definitely-not-a-binary"))
            .unwrap_err();
        let evalme = err.downcast_ref::<EvalmeError>().unwrap();
        match evalme {
            EvalmeError::HarnessFailure { status, stderr } => {
                assert_eq!(status.code(), Some(7));
                assert!(stderr.contains("no such command"));
            }
            other => panic!("expected HarnessFailure, got {other:?}"),
        }
        assert_eq!(evalme.exit_code(), 7);
    }

    #[test]
    fn measure_rejects_malformed_export() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let body = format!("{FIND_EXPORT}\necho 'not json' > \"$out\"\n");
        let harness = write_fake_harness(tmp.path(), &body);

        let provider = Hyperfine::with_program(harness.to_string_lossy());
        let err = provider.measure(&BenchmarkRequest::new("true")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvalmeError>(),
            Some(EvalmeError::MalformedHarnessOutput { .. })
        ));
    }

    #[test]
    fn measure_fails_when_harness_binary_missing() {
        let provider = Hyperfine::with_program("/nonexistent/hyperfine");
        let err = provider.measure(&BenchmarkRequest::new("true")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvalmeError>(),
            Some(EvalmeError::SpawnFailure { .. })
        ));
    }

    #[test]
    fn measure_forwards_timing_flags() {
        let tmp = assert_fs::TempDir::new().unwrap();
        // Record the full argv, then emit a valid export.
        let argv_log = tmp.path().join("argv.txt");
        let body = format!(
            "printf '%s\\n' \"$@\" > {log}\n{FIND_EXPORT}\ncat > \"$out\" <<'EOF'\n{EXPORT_FIXTURE}\nEOF\n",
            log = argv_log.display()
        );
        let harness = write_fake_harness(tmp.path(), &body);

        let provider = Hyperfine::with_program(harness.to_string_lossy());
        let mut req = BenchmarkRequest::new("grep -R TODO .");
        req.runs = 5;
        req.warmup = Some(2);
        req.prepare = Some("sync".to_string());
        req.cleanup = Some("rm -f out".to_string());
        provider.measure(&req).unwrap();

        let argv = fs::read_to_string(&argv_log).unwrap();
        let lines: Vec<&str> = argv.lines().collect();
        assert!(lines.windows(2).any(|w| w == ["--runs", "5"]));
        assert!(lines.windows(2).any(|w| w == ["--warmup", "2"]));
        assert!(lines.windows(2).any(|w| w == ["--prepare", "sync"]));
        assert!(lines.windows(2).any(|w| w == ["--cleanup", "rm -f out"]));
        // The benchmarked command is passed as one final argument.
        assert_eq!(lines.last(), Some(&"grep -R TODO ."));
    }

    #[test]
    fn invalid_request_rejected_before_harness_runs() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let marker = tmp.path().join("ran");
        let body = format!("touch {}\nexit 0\n", marker.display());
        let harness = write_fake_harness(tmp.path(), &body);

        let provider = Hyperfine::with_program(harness.to_string_lossy());
        let mut req = BenchmarkRequest::new("true");
        req.runs = 0;
        assert!(provider.measure(&req).is_err());
        assert!(!marker.exists(), "harness must not run for runs=0");
    }
}
