use crate::types::MemoryStats;

/// Reduce one raw byte-count sequence to its descriptive statistics.
///
/// Uses the sample standard deviation (n − 1 denominator): run counts are
/// small (default 10) and the samples are a draw from the process's memory
/// behaviour, not the whole population. An empty sequence reduces to an
/// explicit "no data" summary instead of dividing by zero; a single sample
/// has no stddev.
pub fn reduce(samples: Vec<u64>) -> MemoryStats {
    let count = samples.len();
    if count == 0 {
        return MemoryStats {
            mean: None,
            stddev: None,
            min: None,
            max: None,
            count: 0,
            samples,
        };
    }

    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / count as f64;

    let stddev = if count < 2 {
        None
    } else {
        let variance = samples
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / (count - 1) as f64;
        Some(variance.sqrt())
    };

    let min = samples.iter().copied().min();
    let max = samples.iter().copied().max();

    MemoryStats {
        mean: Some(mean),
        stddev,
        min,
        max,
        count,
        samples,
    }
}
