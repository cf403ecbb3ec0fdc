//! Timing loop and statistics.

use super::FftBenchmark;
use crate::error::FftError;
use std::time::Instant;

/// Timings of one implementation, in milliseconds per single transform except
/// `total`, which spans every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub name: String,
    pub size: usize,
    pub minimum: f64,
    pub maximum: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub total: f64,
}

impl BenchmarkResult {
    /// Builds a result from per-batch durations in milliseconds.
    pub fn from_batches(name: &str, size: usize, batches: &[f64], inner_iterations: usize) -> Self {
        let repeat = batches.len().max(1) as f64;
        let inner = inner_iterations.max(1) as f64;
        let total: f64 = batches.iter().sum();
        let min = batches.iter().copied().fold(f64::INFINITY, f64::min);
        let max = batches.iter().copied().fold(0.0, f64::max);
        let batch_mean = total / repeat;
        let variance = batches
            .iter()
            .map(|t| (t - batch_mean) * (t - batch_mean))
            .sum::<f64>()
            / repeat;
        Self {
            name: name.to_string(),
            size,
            minimum: if batches.is_empty() { 0.0 } else { min / inner },
            maximum: max / inner,
            mean: batch_mean / inner,
            std_dev: variance.sqrt() / inner,
            total,
        }
    }
}

/// Runs each benchmark as `repeat` timed batches of `inner_iterations` transforms.
#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    inner_iterations: usize,
    forward: bool,
}

impl Default for BenchmarkRunner {
    fn default() -> Self {
        Self::new(50)
    }
}

impl BenchmarkRunner {
    pub fn new(inner_iterations: usize) -> Self {
        Self {
            inner_iterations: inner_iterations.max(1),
            forward: true,
        }
    }

    /// Times backward transforms instead of forward ones.
    pub fn backward(mut self) -> Self {
        self.forward = false;
        self
    }

    pub fn inner_iterations(&self) -> usize {
        self.inner_iterations
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn run(
        &self,
        test: &mut dyn FftBenchmark,
        data: &[f64],
        repeat: usize,
    ) -> Result<BenchmarkResult, FftError> {
        test.initialize(data)?;
        // Warm-up.
        test.run(self.forward);

        let mut batches = Vec::with_capacity(repeat);
        for _ in 0..repeat {
            let start = Instant::now();
            for _ in 0..self.inner_iterations {
                test.run(self.forward);
            }
            batches.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        log::debug!(
            "{}: {} {} batches of {}",
            test.name(),
            repeat,
            if self.forward { "forward" } else { "backward" },
            self.inner_iterations
        );
        Ok(BenchmarkResult::from_batches(
            test.name(),
            test.size(),
            &batches,
            self.inner_iterations,
        ))
    }
}
