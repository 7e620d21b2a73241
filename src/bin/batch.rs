use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use evalme::batch::{self, BatchConfig};
use evalme::timing::Hyperfine;

#[derive(Parser)]
#[command(
    name = "evalme-batch",
    version,
    about = "Benchmark cipher/decipher implementations across a directory tree"
)]
struct Cli {
    /// Input directory. Must contain a "Plaintext" folder with the
    /// original files, plus one folder per cipher algorithm holding a
    /// script.sh accepting `-e|-d <in> <out> -m <mode> -k <keylen>`.
    input_directory: PathBuf,

    /// Base name of the results file (".json" is appended)
    output: String,

    /// Perform exactly NUM runs per benchmarked command
    #[arg(short, long, default_value_t = 10)]
    runs: u32,

    /// Cipher modes to benchmark
    #[arg(long, value_delimiter = ',', default_value = "cbc,ctr,ecb")]
    modes: Vec<String>,

    /// Key lengths (bits) to benchmark
    #[arg(long, value_delimiter = ',', default_value = "128,192,256")]
    key_lengths: Vec<u32>,
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = BatchConfig {
        input_dir: cli.input_directory,
        output_base: cli.output,
        runs: cli.runs,
        modes: cli.modes,
        key_lengths: cli.key_lengths,
    };

    let provider = Hyperfine::from_env();
    let tree = batch::run_batch(&config, &provider)?;
    let path = batch::write_results(&tree, &config.output_base)?;
    eprintln!("Results written to {}", path.display());

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(-1);
    }
}
