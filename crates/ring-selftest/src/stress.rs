//! The stress workload: P producers and C consumers on one ring.
//!
//! Producers push disjoint ranges of `1..=N`, consumers pull fixed quotas and
//! keep private tallies. Once every thread has joined the ring must be empty
//! and the tallies must add up to exactly `N` items summing to `N(N+1)/2`.
//! Any lost, duplicated or torn item breaks one of the two sums.

use crate::config::{BackoffKind, StressConfig};
use crate::error::{Role, SelftestError};
use mpmc_ring::{Backoff, BackoffPolicy, Config, Ring, SpinLoop, YieldNow};
use serde::Serialize;
use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Items carried by the stress ring. `Option<NonZeroUsize>` is pointer-sized
/// with `None` as the null sentinel.
type Item = NonZeroUsize;

/// What one consumer saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConsumerTally {
    /// Consumer index.
    pub index: usize,
    /// Items received.
    pub count: u64,
    /// Sum of the received values.
    pub total: u128,
}

/// Outcome of a successful stress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Items pushed through the ring, `N`.
    pub elements: u64,
    /// Ring slots.
    pub capacity: usize,
    /// Retry policy used by every worker.
    pub backoff: BackoffKind,
    /// Items received across all consumers.
    pub count: u64,
    /// Sum of every received value.
    pub total: u128,
    /// Always `N`.
    pub expected_count: u64,
    /// `N(N+1)/2`.
    pub expected_total: u128,
    /// Wall time from the first spawn to the last join.
    pub elapsed: Duration,
    /// One tally per consumer, in consumer order.
    pub per_consumer: Vec<ConsumerTally>,
}

impl StressReport {
    /// True iff both the count and the sum match the closed form.
    pub fn passed(&self) -> bool {
        self.count == self.expected_count && self.total == self.expected_total
    }

    /// Items moved through the ring per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.count as f64 / secs
        }
    }
}

/// Runs one stress workload and checks the totals.
///
/// Returns `Err(Mismatch)` or `Err(NotDrained)` if the ring misbehaved, and
/// `Err(WorkerPanicked)` if a worker died. A dead worker makes the others
/// give up instead of waiting on a ring that will never drain or fill.
pub fn run_stress(config: &StressConfig) -> Result<StressReport, SelftestError> {
    config.validate()?;

    match config.backoff {
        BackoffKind::Yield => run_with(config, || YieldNow),
        BackoffKind::Spin => run_with(config, || SpinLoop),
        BackoffKind::Adaptive => run_with(config, Backoff::new),
    }
}

/// Raises the shared abort flag if the owning worker unwinds.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

fn run_with<B, F>(config: &StressConfig, make_policy: F) -> Result<StressReport, SelftestError>
where
    B: BackoffPolicy,
    F: Fn() -> B + Sync,
{
    let ring = Ring::<Item>::with_config(Config::new(config.capacity, false));
    let abort = AtomicBool::new(false);
    let per_producer = config.per_producer() as usize;
    let per_consumer = config.per_consumer();

    debug!(
        producers = config.producers,
        consumers = config.consumers,
        elements = config.elements,
        capacity = %config.capacity,
        "starting stress run"
    );

    let start = Instant::now();
    let tallies = thread::scope(|s| -> Result<Vec<ConsumerTally>, SelftestError> {
        let ring = &ring;
        let abort = &abort;
        let make_policy = &make_policy;
        let spawn_failed = |role: Role, index: usize, source: io::Error| {
            abort.store(true, Ordering::Relaxed);
            error!(%role, index, "failed to spawn worker, aborting run");
            SelftestError::Spawn { role, index, source }
        };

        let mut producers = Vec::with_capacity(config.producers);
        for index in 0..config.producers {
            let handle = thread::Builder::new()
                .name(format!("producer-{index}"))
                .spawn_scoped(s, move || {
                    let _guard = AbortOnPanic(abort);
                    let first = index * per_producer + 1;
                    produce_range(ring, first, first + per_producer - 1, make_policy(), abort);
                })
                .map_err(|source| spawn_failed(Role::Producer, index, source))?;
            producers.push(handle);
        }

        let mut consumers = Vec::with_capacity(config.consumers);
        for index in 0..config.consumers {
            let handle = thread::Builder::new()
                .name(format!("consumer-{index}"))
                .spawn_scoped(s, move || {
                    let _guard = AbortOnPanic(abort);
                    consume_quota(ring, index, per_consumer, make_policy(), abort)
                })
                .map_err(|source| spawn_failed(Role::Consumer, index, source))?;
            consumers.push(handle);
        }

        // Join everything before reporting so no panicked thread is left
        // for the scope to re-raise.
        let mut first_panic = None;
        for (index, handle) in producers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(index, "producer panicked");
                first_panic.get_or_insert(SelftestError::WorkerPanicked {
                    role: Role::Producer,
                    index,
                });
            } else {
                debug!(index, "producer finished");
            }
        }

        let mut tallies = Vec::with_capacity(config.consumers);
        for (index, handle) in consumers.into_iter().enumerate() {
            match handle.join() {
                Ok(tally) => {
                    debug!(index, count = tally.count, "consumer finished");
                    tallies.push(tally);
                }
                Err(_) => {
                    error!(index, "consumer panicked");
                    first_panic.get_or_insert(SelftestError::WorkerPanicked {
                        role: Role::Consumer,
                        index,
                    });
                }
            }
        }

        match first_panic {
            Some(err) => Err(err),
            None => Ok(tallies),
        }
    })?;

    check(config, ring, tallies, start.elapsed())
}

/// Verifies a finished run: the ring must be empty and the tallies must
/// match the closed form.
fn check(
    config: &StressConfig,
    ring: Ring<Item>,
    tallies: Vec<ConsumerTally>,
    elapsed: Duration,
) -> Result<StressReport, SelftestError> {
    if !ring.is_empty() {
        let remaining = ring.cleanup_with(drop);
        error!(remaining, "ring not drained after all workers joined");
        return Err(SelftestError::NotDrained { remaining });
    }
    ring.cleanup();

    let count: u64 = tallies.iter().map(|t| t.count).sum();
    let total: u128 = tallies.iter().map(|t| t.total).sum();
    let report = StressReport {
        producers: config.producers,
        consumers: config.consumers,
        elements: config.elements,
        capacity: config.capacity.get(),
        backoff: config.backoff,
        count,
        total,
        expected_count: config.elements,
        expected_total: config.expected_total(),
        elapsed,
        per_consumer: tallies,
    };

    if !report.passed() {
        error!("mpmc ring self-test failed:");
        error!("Count: {}, expected: {}", report.count, report.expected_count);
        error!("Total: {}, expected: {}", report.total, report.expected_total);
        return Err(SelftestError::Mismatch {
            count: report.count,
            expected_count: report.expected_count,
            total: report.total,
            expected_total: report.expected_total,
        });
    }

    info!(
        elapsed = ?report.elapsed,
        items_per_sec = report.throughput() as u64,
        "{}p/{}c over {} slots: pass",
        report.producers,
        report.consumers,
        report.capacity
    );
    Ok(report)
}

/// Pushes `first..=last` in ascending order, snoozing whenever the ring is
/// full. Gives up once `abort` is raised.
fn produce_range<B: BackoffPolicy>(
    ring: &Ring<Item>,
    first: usize,
    last: usize,
    mut policy: B,
    abort: &AtomicBool,
) {
    for value in first..=last {
        // `first` is at least 1, so every value is non-zero.
        let Some(mut item) = NonZeroUsize::new(value) else {
            continue;
        };
        loop {
            match ring.produce(item) {
                Ok(()) => {
                    policy.reset();
                    break;
                }
                Err(rejected) => {
                    if abort.load(Ordering::Relaxed) {
                        return;
                    }
                    item = rejected;
                    policy.snooze();
                }
            }
        }
    }
}

/// Pulls exactly `quota` items, keeping the tally local to this thread.
/// Returns early with a short tally once `abort` is raised.
fn consume_quota<B: BackoffPolicy>(
    ring: &Ring<Item>,
    index: usize,
    quota: u64,
    mut policy: B,
    abort: &AtomicBool,
) -> ConsumerTally {
    let mut tally = ConsumerTally {
        index,
        ..ConsumerTally::default()
    };
    while tally.count < quota {
        if let Some(item) = ring.consume() {
            policy.reset();
            tally.total += item.get() as u128;
            tally.count += 1;
        } else if abort.load(Ordering::Relaxed) {
            break;
        } else {
            policy.snooze();
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpmc_ring::Capacity;

    #[test]
    fn test_single_pair_passes() {
        let config = StressConfig::new(1, 1, 1000, Capacity::new(16).unwrap());
        let report = run_stress(&config).unwrap();

        assert!(report.passed());
        assert_eq!(report.count, 1000);
        assert_eq!(report.total, 500_500);
        assert_eq!(report.per_consumer.len(), 1);
    }

    #[test]
    fn test_invalid_config_never_spawns() {
        let config = StressConfig::new(3, 1, 1000, Capacity::new(16).unwrap());
        assert!(matches!(
            run_stress(&config),
            Err(SelftestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_consumer_tallies_add_up() {
        let config = StressConfig::new(2, 4, 4000, Capacity::new(8).unwrap())
            .with_backoff(BackoffKind::Adaptive);
        let report = run_stress(&config).unwrap();

        assert!(report.per_consumer.iter().all(|t| t.count == 1000));
        assert_eq!(
            report.per_consumer.iter().map(|t| t.total).sum::<u128>(),
            report.expected_total
        );
    }

    #[test]
    fn test_produce_range_is_ascending() {
        let ring = Ring::<Item>::new(16).unwrap();
        produce_range(&ring, 5, 9, YieldNow, &AtomicBool::new(false));

        let got: Vec<usize> = std::iter::from_fn(|| ring.consume()).map(NonZeroUsize::get).collect();
        assert_eq!(got, vec![5, 6, 7, 8, 9]);
    }

    /// Policy factory that kills every worker whose thread name starts with
    /// `prefix` before it touches the ring.
    fn dies_on(prefix: &'static str) -> impl Fn() -> YieldNow + Sync {
        move || {
            let name = thread::current().name().map(str::to_owned).unwrap_or_default();
            if name.starts_with(prefix) {
                panic!("{name} died");
            }
            YieldNow
        }
    }

    #[test]
    fn test_consumer_panic_is_reported_not_hung() {
        // Two slots fill immediately, so the producer depends on the
        // abort flag to stop retrying.
        let config = StressConfig::new(1, 1, 10_000, Capacity::new(2).unwrap());
        match run_with(&config, dies_on("consumer-")) {
            Err(SelftestError::WorkerPanicked { role, index }) => {
                assert_eq!(role, Role::Consumer);
                assert_eq!(index, 0);
            }
            other => panic!("expected WorkerPanicked, got {:?}", other),
        }
    }

    #[test]
    fn test_producer_panic_is_reported_not_hung() {
        let config = StressConfig::new(2, 1, 1000, Capacity::new(4).unwrap());
        match run_with(&config, dies_on("producer-1")) {
            Err(SelftestError::WorkerPanicked { role, index }) => {
                assert_eq!(role, Role::Producer);
                assert_eq!(index, 1);
            }
            other => panic!("expected WorkerPanicked, got {:?}", other),
        }
    }

    #[test]
    fn test_aborted_consumer_returns_short_tally() {
        let ring = Ring::<Item>::new(4).unwrap();
        ring.produce(NonZeroUsize::new(7).unwrap()).unwrap();

        let tally = consume_quota(&ring, 2, 10, YieldNow, &AtomicBool::new(true));
        assert_eq!(tally.index, 2);
        assert_eq!(tally.count, 1);
        assert_eq!(tally.total, 7);
    }

    #[test]
    fn test_check_rejects_undrained_ring() {
        let config = StressConfig::new(1, 1, 3, Capacity::new(4).unwrap());
        let ring = Ring::<Item>::new(4).unwrap();
        ring.produce(NonZeroUsize::new(3).unwrap()).unwrap();
        let tallies = vec![ConsumerTally { index: 0, count: 2, total: 3 }];

        match check(&config, ring, tallies, Duration::ZERO) {
            Err(err @ SelftestError::NotDrained { remaining: 1 }) => {
                assert!(err.is_correctness_defect());
            }
            other => panic!("expected NotDrained, got {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_lost_item() {
        let config = StressConfig::new(1, 1, 3, Capacity::new(4).unwrap());
        let ring = Ring::<Item>::new(4).unwrap();
        let tallies = vec![ConsumerTally { index: 0, count: 2, total: 3 }];

        match check(&config, ring, tallies, Duration::ZERO) {
            Err(SelftestError::Mismatch {
                count,
                expected_count,
                total,
                expected_total,
            }) => {
                assert_eq!((count, expected_count), (2, 3));
                assert_eq!((total, expected_total), (3, 6));
            }
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_duplicated_item() {
        // Right count, wrong sum: value 2 seen twice, value 3 never.
        let config = StressConfig::new(1, 1, 3, Capacity::new(4).unwrap());
        let ring = Ring::<Item>::new(4).unwrap();
        let tallies = vec![ConsumerTally { index: 0, count: 3, total: 5 }];

        assert!(matches!(
            check(&config, ring, tallies, Duration::ZERO),
            Err(SelftestError::Mismatch { count: 3, total: 5, .. })
        ));
    }

    #[test]
    fn test_check_accepts_exact_totals() {
        let config = StressConfig::new(1, 2, 4, Capacity::new(4).unwrap());
        let ring = Ring::<Item>::new(4).unwrap();
        let tallies = vec![
            ConsumerTally { index: 0, count: 2, total: 3 },
            ConsumerTally { index: 1, count: 2, total: 7 },
        ];

        let report = check(&config, ring, tallies, Duration::from_millis(1)).unwrap();
        assert!(report.passed());
        assert_eq!(report.total, 10);
    }
}
