use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use sysinfo::{Pid, System};

use crate::errors::EvalmeError;
use crate::types::BenchmarkRequest;

/// One matched pair of memory readings taken at a single poll tick.
#[derive(Debug, Clone, Copy)]
pub struct MemorySample {
    /// Resident-set size in bytes.
    pub resident: u64,
    /// Virtual address-space size in bytes.
    pub vsize: u64,
}

/// Capability for reading a live process's memory usage. The sampling loop
/// depends only on this seam, so tests can substitute a deterministic probe
/// and the OS-specific inspection stays in one place.
pub trait MemoryProbe {
    /// Read the process's current memory usage. `None` means the process
    /// could not be observed (typically it exited between the liveness
    /// check and the read) — the caller skips that tick silently.
    fn sample(&mut self, pid: u32) -> Option<MemorySample>;
}

/// Production probe backed by the OS process table.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        SysinfoProbe {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn sample(&mut self, pid: u32) -> Option<MemorySample> {
        let pid = Pid::from_u32(pid);
        if !self.system.refresh_process(pid) {
            return None;
        }
        let process = self.system.process(pid)?;
        Some(MemorySample {
            resident: process.memory(),
            vsize: process.virtual_memory(),
        })
    }
}

/// Run the command `request.runs` times sequentially, polling its resident
/// and virtual memory every `request.interval_secs` seconds until it exits.
///
/// Returns the concatenated (resident, virtual) sample sequences across all
/// runs, in run order. Both sequences are always equal in length: one poll
/// tick appends exactly one pair or nothing. A run that finishes before the
/// first tick contributes zero samples.
///
/// The command's output is discarded, not captured. There is no timeout: a
/// target process that never exits blocks the benchmark indefinitely.
pub fn sample_memory(
    request: &BenchmarkRequest,
    probe: &mut dyn MemoryProbe,
) -> Result<(Vec<u64>, Vec<u64>)> {
    request.validate()?;

    let interval = Duration::from_secs_f64(request.interval_secs);
    let mut resident = Vec::new();
    let mut vsize = Vec::new();

    for _ in 0..request.runs {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&request.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EvalmeError::SpawnFailure {
                command: request.command.clone(),
                source,
            })?;

        let pid = child.id();

        loop {
            let exited = child
                .try_wait()
                .map_err(|source| EvalmeError::WaitFailure {
                    command: request.command.clone(),
                    source,
                })?
                .is_some();
            if exited {
                break;
            }

            if let Some(sample) = probe.sample(pid) {
                resident.push(sample.resident);
                vsize.push(sample.vsize);
            }

            thread::sleep(interval);
        }
    }

    Ok((resident, vsize))
}
