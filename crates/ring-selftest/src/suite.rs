//! Named self-tests and the load-time gate that runs them.

use crate::{run_stress, SelftestError, StressConfig, StressReport};
use mpmc_ring::Capacity;
use tracing::{error, info};

/// Queue size used by the built-in workloads.
pub const QUEUE_SIZE: Capacity = Capacity::from_bits(10);

/// One named stress workload.
#[derive(Debug, Clone, Copy)]
pub struct Selftest {
    /// Name used in log lines and failure reports.
    pub name: &'static str,
    /// Workload to run.
    pub config: StressConfig,
}

impl Selftest {
    /// Creates a named test.
    pub const fn new(name: &'static str, config: StressConfig) -> Self {
        Self { name, config }
    }

    /// Runs the workload once.
    pub fn run(&self) -> Result<StressReport, SelftestError> {
        run_stress(&self.config)
    }
}

/// The workloads checked before the ring is trusted with real traffic.
pub fn default_suite() -> Vec<Selftest> {
    vec![
        Selftest::new("mpmc_ring_1p1c", StressConfig::new(1, 1, 1_000, QUEUE_SIZE)),
        Selftest::new("mpmc_ring_2p2c", StressConfig::new(2, 2, 100_000, QUEUE_SIZE)),
        Selftest::new("mpmc_ring_4p1c", StressConfig::new(4, 1, 100_000, QUEUE_SIZE)),
        Selftest::new(
            "mpmc_ring_4p4c_contended",
            StressConfig::new(4, 4, 100_000, Capacity::from_bits(3)),
        ),
    ]
}

/// Runs every test in order, logging each result.
///
/// All tests run even after a failure. Fails with [`SelftestError::Failed`]
/// if any of them did.
pub fn run_all(tests: &[Selftest]) -> Result<Vec<StressReport>, SelftestError> {
    let mut reports = Vec::with_capacity(tests.len());
    let mut failures = Vec::new();

    for test in tests {
        match test.run() {
            Ok(report) => {
                info!(test = test.name, "self-test: pass");
                reports.push(report);
            }
            Err(err) => {
                error!(test = test.name, %err, "self-test: fail");
                failures.push((test.name, err));
            }
        }
    }

    if !failures.is_empty() {
        return Err(SelftestError::Failed {
            failures,
            total: tests.len(),
        });
    }
    info!(count = tests.len(), "all self-tests passed");
    Ok(reports)
}
