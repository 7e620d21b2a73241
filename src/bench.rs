use anyhow::Result;

use crate::memory::{self, MemoryProbe, SysinfoProbe};
use crate::stats;
use crate::timing::{Hyperfine, TimingProvider};
use crate::types::{BenchmarkRequest, BenchmarkResult, MemoryUsage};

/// Run both measurement pipelines against one request and package the
/// outcome. Timing runs first: if the harness fails, no memory sampling is
/// attempted. Pure packaging beyond that — no unit conversion, no rounding.
pub fn run(
    request: &BenchmarkRequest,
    provider: &dyn TimingProvider,
    probe: &mut dyn MemoryProbe,
) -> Result<BenchmarkResult> {
    request.validate()?;

    let timing = provider.measure(request)?;
    let (resident, vsize) = memory::sample_memory(request, probe)?;

    Ok(BenchmarkResult {
        command: request.command.clone(),
        timing,
        memory: MemoryUsage {
            real: stats::reduce(resident),
            virtual_mem: stats::reduce(vsize),
        },
    })
}

/// `run` with the production collaborators: the hyperfine adapter
/// (honouring the `EVALME_HYPERFINE` override) and the OS memory probe.
pub fn run_default(request: &BenchmarkRequest) -> Result<BenchmarkResult> {
    let provider = Hyperfine::from_env();
    let mut probe = SysinfoProbe::new();
    run(request, &provider, &mut probe)
}
