use std::process;

use anyhow::Result;
use clap::Parser;

use evalme::bench;
use evalme::errors::EvalmeError;
use evalme::report;
use evalme::types::{BenchmarkRequest, OutputMode};

#[derive(Parser)]
#[command(
    name = "evalme",
    version,
    about = "Benchmark a command's execution time and memory usage"
)]
struct Cli {
    /// The command or binary to benchmark (shell-interpreted)
    command: String,

    /// Perform exactly NUM timed and memory-sampled runs
    #[arg(short, long, default_value_t = 10)]
    runs: u32,

    /// Seconds between memory polls of the running process
    #[arg(short, long, default_value_t = 0.1)]
    interval: f64,

    /// Perform NUM warmup runs before the actual benchmark. This can be
    /// used to fill (disk) caches for I/O-heavy programs.
    #[arg(short, long)]
    warmup: Option<u32>,

    /// Execute CMD before each timing run, e.g. for clearing disk caches
    #[arg(short, long)]
    prepare: Option<String>,

    /// Execute CMD after the completion of all timing runs
    #[arg(short, long)]
    cleanup: Option<String>,

    /// Echo the timing harness's raw output
    #[arg(short, long)]
    verbose: bool,

    /// Emit a single JSON document on stdout and nothing else
    #[arg(long)]
    json: bool,
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let request = BenchmarkRequest {
        command: cli.command,
        runs: cli.runs,
        interval_secs: cli.interval,
        warmup: cli.warmup,
        prepare: cli.prepare,
        cleanup: cli.cleanup,
        verbose: cli.verbose,
        output_mode: if cli.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        },
    };

    let result = bench::run_default(&request)?;

    let output = match request.output_mode {
        OutputMode::Json => report::format_json(&result),
        OutputMode::Text => report::format_text(&result),
    };
    println!("{}", output);

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        let code = err
            .downcast_ref::<EvalmeError>()
            .map(EvalmeError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}
