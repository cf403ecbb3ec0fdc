//! FFT benchmark
//!
//! Times every available implementation on the same signal and prints a report.

use anyhow::{Context, Result};
use clap::Parser;
use fftwrap::bench::{self, signal, BenchmarkRunner, FftBenchmark};
use fftwrap::config::FftConfig;
use fftwrap::Library;
use log::{LevelFilter, Log, Metadata, Record};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fftbench")]
#[command(about = "Benchmark FFT implementations over native buffers")]
struct Args {
    /// Transform size as a power of two (6..=14)
    size_log2: Option<u32>,

    /// Timed batches per implementation (20..=200)
    repeat: Option<usize>,

    /// Configuration file (default: fftwrap.toml in this or a parent directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the pure-Rust engine even when FFTW is installed
    #[arg(long)]
    reference: bool,

    /// Benchmark the first channel of a WAV file instead of a synthetic signal
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Print the spectrum round-trip error of each implementation
    #[arg(long)]
    check: bool,

    /// Time inverse transforms instead of forward ones
    #[arg(long)]
    backward: bool,

    /// More logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => FftConfig::load(path).context("Failed to load configuration")?,
        None => FftConfig::load_from_cwd().context("Failed to load configuration")?,
    };
    if let Some(size_log2) = args.size_log2 {
        config.bench.size_log2 = size_log2;
    }
    if let Some(repeat) = args.repeat {
        config.bench.repeat = repeat;
    }
    let size = config.bench.size();
    let repeat = config.bench.repeat();

    let (double, single) = if args.reference {
        (Library::<f64>::reference(), Library::<f32>::reference())
    } else {
        (
            Library::<f64>::load_with(&config).context("Failed to load double precision FFTW")?,
            Library::<f32>::load_with(&config).context("Failed to load single precision FFTW")?,
        )
    };
    log::info!("engines: double={}, single={}", double.name(), single.name());

    let data = match &args.wav {
        Some(path) => {
            let mut samples = signal::load_wav(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            samples.resize(size, 0.0);
            samples
        }
        None => signal::sine3(size),
    };

    println!(
        "FFT size: {}, repeat: {}{}",
        size,
        repeat,
        if args.backward { ", backward" } else { "" }
    );

    let mut runner = BenchmarkRunner::new(config.bench.inner_iterations());
    if args.backward {
        runner = runner.backward();
    }
    let mut results = Vec::new();
    for mut test in bench::load_tests(&double, &single) {
        match runner.run(test.as_mut(), &data, repeat) {
            Ok(result) => results.push(result),
            Err(err) => {
                log::warn!("{} skipped: {}", test.name(), err);
                continue;
            }
        }
        if args.check {
            report_round_trip(test.as_mut(), &data)?;
        }
    }

    print!("{}", bench::create_text(&results, None));
    Ok(())
}

fn report_round_trip(test: &mut dyn FftBenchmark, data: &[f64]) -> Result<()> {
    let mut restored = data.to_vec();
    test.spectrum(&mut restored, true)
        .with_context(|| format!("{} spectrum failed", test.name()))?;
    let error = data
        .iter()
        .zip(&restored)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    println!("{:>16}: max round-trip error {:.3e}", test.name(), error);
    Ok(())
}
