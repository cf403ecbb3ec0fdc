//! Console report.

use super::BenchmarkResult;
use std::fmt::Write;

/// Results ordered by total time, with totals relative to `pivot` (or the fastest
/// implementation when `pivot` is absent or unknown). Per-transform timings are
/// printed in microseconds.
pub fn create_text(results: &[BenchmarkResult], pivot: Option<&str>) -> String {
    let mut sorted: Vec<&BenchmarkResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.total.total_cmp(&b.total));

    let mut text = String::from("\n");
    let Some(fastest) = sorted.first() else {
        return text;
    };
    let reference = pivot
        .and_then(|name| sorted.iter().find(|r| r.name == name))
        .unwrap_or(fastest)
        .total;

    for result in &sorted {
        let relative = if reference > 0.0 {
            result.total / reference
        } else {
            0.0
        };
        // Writing to a String cannot fail.
        let _ = writeln!(
            text,
            "{:>16}: {:4.1}  [min: {:7.2}, max: {:7.2}, mean: {:7.2}, stddev: {:7.2}]",
            result.name,
            relative,
            result.minimum * 1000.0,
            result.maximum * 1000.0,
            result.mean * 1000.0,
            result.std_dev * 1000.0,
        );
    }
    text.push_str("\nTiming in microseconds.\n");
    text
}
