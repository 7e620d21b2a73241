use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::types::{BenchmarkResult, MemoryStats, MemoryUsage, TimingStats};

/// Format a byte count with decimal units, like `2.5 MB`.
/// Counts below 1 KB are printed exactly.
pub fn format_bytes(bytes: f64) -> String {
    if bytes < 1000.0 {
        format!("{:.0} B", bytes)
    } else if bytes < 1_000_000.0 {
        format!("{:.1} KB", bytes / 1000.0)
    } else if bytes < 1_000_000_000.0 {
        format!("{:.1} MB", bytes / 1_000_000.0)
    } else {
        format!("{:.2} GB", bytes / 1_000_000_000.0)
    }
}

/// Format a duration in seconds as milliseconds, like `1002.1 ms`.
pub fn format_ms(seconds: f64) -> String {
    format!("{:.1} ms", seconds * 1000.0)
}

fn style_label() -> Style {
    Style::new().cyan().bold()
}

fn styled_label(label: &str) -> String {
    label
        .if_supports_color(Stream::Stdout, |s| s.style(style_label()))
        .to_string()
}

/// Human-readable report: milliseconds for timing, scaled units for memory.
pub fn format_text(result: &BenchmarkResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Benchmark results for \"{}\" ({} runs):\n\n",
        result.command,
        result.timing.times.len()
    ));

    out.push_str(&styled_label("CPU (wall clock)"));
    out.push('\n');
    out.push_str(&format_timing_section(&result.timing));
    out.push('\n');

    out.push_str(&styled_label("Memory (resident)"));
    out.push('\n');
    out.push_str(&format_memory_section(&result.memory.real));
    out.push('\n');

    out.push_str(&styled_label("Memory (virtual)"));
    out.push('\n');
    out.push_str(&format_memory_section(&result.memory.virtual_mem));

    out
}

fn format_timing_section(timing: &TimingStats) -> String {
    let mean = match timing.stddev {
        Some(stddev) => format!("{} ± {}", format_ms(timing.mean), format_ms(stddev)),
        None => format_ms(timing.mean),
    };
    format!(
        "  mean ± stddev:  {}\n  median:         {}\n  range:          {} … {}\n  user / system:  {} / {}\n",
        mean,
        format_ms(timing.median),
        format_ms(timing.min),
        format_ms(timing.max),
        format_ms(timing.user),
        format_ms(timing.system),
    )
}

fn format_memory_section(stats: &MemoryStats) -> String {
    let Some(mean) = stats.mean else {
        // Possible for commands that exit before the first poll tick.
        return "  no samples collected (process exited before the first poll)\n".to_string();
    };

    let mean = match stats.stddev {
        Some(stddev) => format!("{} ± {}", format_bytes(mean), format_bytes(stddev)),
        None => format_bytes(mean),
    };
    // min/max are always present when mean is.
    let min = stats.min.unwrap_or_default();
    let max = stats.max.unwrap_or_default();
    format!(
        "  mean ± stddev:  {}\n  range:          {} … {}\n  samples:        {}\n",
        mean,
        format_bytes(min as f64),
        format_bytes(max as f64),
        stats.count,
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    command: &'a str,
    results: JsonResults<'a>,
}

#[derive(Serialize)]
struct JsonResults<'a> {
    cpu: &'a TimingStats,
    memory: &'a MemoryUsage,
}

/// Machine-readable report: seconds for timing, bytes for memory, no unit
/// conversion, raw sample sequences included.
pub fn format_json(result: &BenchmarkResult) -> String {
    let report = JsonReport {
        command: &result.command,
        results: JsonResults {
            cpu: &result.timing,
            memory: &result.memory,
        },
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}
