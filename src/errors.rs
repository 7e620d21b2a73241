use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(thiserror::Error, Debug)]
pub enum EvalmeError {
    #[error("Run count must be at least 1 (got {runs})")]
    InvalidRuns { runs: u32 },

    #[error("Sampling interval must be a positive number of seconds (got {interval})")]
    InvalidInterval { interval: f64 },

    #[error("Failed to launch \"{command}\": {source}")]
    SpawnFailure {
        command: String,
        source: std::io::Error,
    },

    #[error("Failed to wait on \"{command}\": {source}")]
    WaitFailure {
        command: String,
        source: std::io::Error,
    },

    #[error("Timing harness failed ({status})\n{stderr}")]
    HarnessFailure { status: ExitStatus, stderr: String },

    #[error("Could not parse timing harness export: {detail}")]
    MalformedHarnessOutput { detail: String },

    #[error(
        "Integrity check failed for {path}: decrypted hash {actual} does not match original {expected}"
    )]
    IntegrityFailure {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("No \"Plaintext\" directory found at {path}")]
    PlaintextDirNotFound { path: PathBuf },

    #[error("No plaintext files found under {path}")]
    NoPlaintextFiles { path: PathBuf },
}

impl EvalmeError {
    /// Process exit code for this error. Harness failures propagate the
    /// harness's own code so callers can distinguish them from ours.
    pub fn exit_code(&self) -> i32 {
        match self {
            EvalmeError::HarnessFailure { status, .. } => status.code().unwrap_or(1),
            _ => 1,
        }
    }
}
