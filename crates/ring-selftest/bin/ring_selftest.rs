use clap::{Parser, ValueEnum};
use mpmc_ring::Capacity;
use ring_selftest::{default_suite, init_tracing, run_all, run_stress, BackoffKind, StressConfig};
use std::process::ExitCode;
use tracing::error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackoffArg {
    Yield,
    Spin,
    Adaptive,
}

impl From<BackoffArg> for BackoffKind {
    fn from(arg: BackoffArg) -> Self {
        match arg {
            BackoffArg::Yield => BackoffKind::Yield,
            BackoffArg::Spin => BackoffKind::Spin,
            BackoffArg::Adaptive => BackoffKind::Adaptive,
        }
    }
}

/// Concurrency self-test for the bounded MPMC ring.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Producer thread count
    #[arg(short, long, default_value_t = 2)]
    producers: usize,

    /// Consumer thread count
    #[arg(short, long, default_value_t = 2)]
    consumers: usize,

    /// Total elements; must be divisible by both thread counts
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    elements: u64,

    /// Ring capacity (positive power of two)
    #[arg(short = 'q', long, default_value = "1024", value_parser = parse_capacity, allow_hyphen_values = true)]
    capacity: Capacity,

    /// How workers wait on a full or empty ring
    #[arg(long, value_enum, default_value_t = BackoffArg::Yield)]
    backoff: BackoffArg,

    /// Run the built-in suite instead of a single configuration
    #[arg(long)]
    suite: bool,

    /// Print the report(s) as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn parse_capacity(s: &str) -> Result<Capacity, String> {
    let requested: i64 = s.parse().map_err(|e| format!("{s:?} is not an integer: {e}"))?;
    Capacity::try_from(requested).map_err(|e| e.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(err) => {
            error!(%err, "failed to encode report");
            false
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let ok = if args.suite {
        match run_all(&default_suite()) {
            Ok(reports) => !args.json || print_json(&reports),
            Err(err) => {
                error!(%err, "self-test suite failed");
                false
            }
        }
    } else {
        let config = StressConfig::new(args.producers, args.consumers, args.elements, args.capacity)
            .with_backoff(args.backoff.into());
        match run_stress(&config) {
            Ok(report) => !args.json || print_json(&report),
            Err(err) => {
                error!(%err, "self-test failed");
                false
            }
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
