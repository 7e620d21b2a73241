use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::bench;
use crate::errors::EvalmeError;
use crate::memory::SysinfoProbe;
use crate::timing::TimingProvider;
use crate::types::{BenchmarkRequest, BenchmarkResult, shell_escape_single_quote};

/// Directory of reference files inside the input tree.
pub const PLAINTEXT_DIR: &str = "Plaintext";

/// Fixed-name driver script every algorithm directory must provide,
/// accepting `-e|-d <in> <out> -m <mode> -k <keylen>`.
pub const CIPHER_SCRIPT: &str = "script.sh";

const ENCRYPT: &str = "encrypt";
const DECRYPT: &str = "decrypt";

/// Inputs of one batch traversal. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    /// Base name of the results file; `.json` is appended.
    pub output_base: String,
    pub runs: u32,
    pub modes: Vec<String>,
    pub key_lengths: Vec<u32>,
}

/// Timing and memory summary of one directional benchmark. `mean` is
/// seconds; `mem`/`vmem` are mean bytes, null when no samples were seen.
#[derive(Debug, Clone, Serialize)]
pub struct CpuSummary {
    pub mean: f64,
    pub mem: Option<f64>,
    pub vmem: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectionalSummary {
    pub cpu: CpuSummary,
}

impl From<&BenchmarkResult> for DirectionalSummary {
    fn from(result: &BenchmarkResult) -> Self {
        DirectionalSummary {
            cpu: CpuSummary {
                mean: result.timing.mean,
                mem: result.memory.real.mean,
                vmem: result.memory.virtual_mem.mean,
            },
        }
    }
}

type DirectionMap = BTreeMap<String, DirectionalSummary>;
type KeyLengthMap = BTreeMap<String, DirectionMap>;
type ModeMap = BTreeMap<String, KeyLengthMap>;
type FileMap = BTreeMap<String, ModeMap>;

/// Typed results tree: algorithm → file → mode → key length → direction.
/// Built bottom-up by the sequential driver loop, serialized once at the
/// end of a complete traversal.
#[derive(Debug, Default, Serialize)]
pub struct ResultsTree {
    results: BTreeMap<String, FileMap>,
}

impl ResultsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        algorithm: &str,
        file: &str,
        mode: &str,
        key_length: u32,
        direction: &str,
        summary: DirectionalSummary,
    ) {
        self.results
            .entry(algorithm.to_string())
            .or_default()
            .entry(file.to_string())
            .or_default()
            .entry(mode.to_string())
            .or_default()
            .entry(key_length.to_string())
            .or_default()
            .insert(direction.to_string(), summary);
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// SHA-256 of a file's contents as lowercase hex, read in 4 KiB chunks so
/// large inputs never have to fit in memory at once.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    Ok(hex)
}

/// A reference file with its content hash, computed once up front.
#[derive(Debug, Clone)]
pub struct Plaintext {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
}

/// Collect and hash every regular file under `<input_dir>/Plaintext/`,
/// sorted by name for a stable traversal order.
pub fn collect_plaintexts(input_dir: &Path) -> Result<Vec<Plaintext>> {
    let plaintext_dir = input_dir.join(PLAINTEXT_DIR);
    if !plaintext_dir.is_dir() {
        return Err(EvalmeError::PlaintextDirNotFound {
            path: plaintext_dir,
        }
        .into());
    }

    let mut plaintexts = Vec::new();
    for entry in WalkDir::new(&plaintext_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();
        let name = entry.file_name().to_string_lossy().into_owned();
        let sha256 = sha256_file(&path)?;
        plaintexts.push(Plaintext { name, path, sha256 });
    }

    if plaintexts.is_empty() {
        return Err(EvalmeError::NoPlaintextFiles {
            path: plaintext_dir,
        }
        .into());
    }

    plaintexts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plaintexts)
}

/// One cipher implementation: a directory holding the driver script.
#[derive(Debug, Clone)]
pub struct Algorithm {
    pub name: String,
    pub script: PathBuf,
}

/// Each subdirectory of the input (except `Plaintext`) that contains the
/// driver script is an algorithm. Sorted by name.
pub fn discover_algorithms(input_dir: &Path) -> Result<Vec<Algorithm>> {
    let mut algorithms = Vec::new();

    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == PLAINTEXT_DIR {
            continue;
        }
        let script = path.join(CIPHER_SCRIPT);
        if script.is_file() {
            algorithms.push(Algorithm { name, script });
        }
    }

    algorithms.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(algorithms)
}

fn cipher_command(
    script: &Path,
    direction_flag: &str,
    input: &Path,
    output: &Path,
    mode: &str,
    key_length: u32,
) -> String {
    format!(
        "{} {} {} {} -m {} -k {}",
        shell_escape_single_quote(&script.to_string_lossy()),
        direction_flag,
        shell_escape_single_quote(&input.to_string_lossy()),
        shell_escape_single_quote(&output.to_string_lossy()),
        mode,
        key_length,
    )
}

/// Walk every (algorithm, plaintext, mode, key length) combination,
/// benchmarking encrypt then decrypt via the core and verifying that the
/// decrypted output hashes back to the original. Fully sequential; any
/// failure (harness error, hash mismatch) aborts the whole traversal and
/// no partial tree is returned.
pub fn run_batch(config: &BatchConfig, provider: &dyn TimingProvider) -> Result<ResultsTree> {
    let plaintexts = collect_plaintexts(&config.input_dir)?;
    let algorithms = discover_algorithms(&config.input_dir)?;

    let work_dir = tempfile::TempDir::new()?;
    let mut probe = SysinfoProbe::new();
    let mut tree = ResultsTree::new();

    for algorithm in &algorithms {
        for plaintext in &plaintexts {
            for mode in &config.modes {
                for &key_length in &config.key_lengths {
                    eprintln!(
                        "[{}] {} mode={} keylen={}",
                        algorithm.name, plaintext.name, mode, key_length
                    );

                    let stem = format!(
                        "{}.{}.{}.{}",
                        plaintext.name, algorithm.name, mode, key_length
                    );
                    let encrypted = work_dir.path().join(format!("{stem}.enc"));
                    let decrypted = work_dir.path().join(format!("{stem}.dec"));

                    let encrypt_cmd = cipher_command(
                        &algorithm.script,
                        "-e",
                        &plaintext.path,
                        &encrypted,
                        mode,
                        key_length,
                    );
                    let mut request = BenchmarkRequest::new(encrypt_cmd);
                    request.runs = config.runs;
                    let encrypt_result = bench::run(&request, provider, &mut probe)?;

                    let decrypt_cmd = cipher_command(
                        &algorithm.script,
                        "-d",
                        &encrypted,
                        &decrypted,
                        mode,
                        key_length,
                    );
                    let mut request = BenchmarkRequest::new(decrypt_cmd);
                    request.runs = config.runs;
                    let decrypt_result = bench::run(&request, provider, &mut probe)?;

                    let actual = sha256_file(&decrypted)?;
                    if actual != plaintext.sha256 {
                        return Err(EvalmeError::IntegrityFailure {
                            path: plaintext.path.clone(),
                            expected: plaintext.sha256.clone(),
                            actual,
                        }
                        .into());
                    }

                    tree.insert(
                        &algorithm.name,
                        &plaintext.name,
                        mode,
                        key_length,
                        ENCRYPT,
                        DirectionalSummary::from(&encrypt_result),
                    );
                    tree.insert(
                        &algorithm.name,
                        &plaintext.name,
                        mode,
                        key_length,
                        DECRYPT,
                        DirectionalSummary::from(&decrypt_result),
                    );
                }
            }
        }
    }

    Ok(tree)
}

/// Serialize the completed tree to `<output_base>.json` and return the path.
pub fn write_results(tree: &ResultsTree, output_base: &str) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{output_base}.json"));
    let json = serde_json::to_string_pretty(tree)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
