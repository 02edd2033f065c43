//! Scheduler engine: drives one queue's discipline until its current assignment is exhausted.
//!
//! Two execution shapes cover the four disciplines:
//! - run-to-completion (FCFS, SJF, Priority): the slots are stably sorted once per pass, then
//!   each running process is ticked until its burst goes negative;
//! - round-robin: a circular cursor gives every running process one tick per visit.
//!
//! A Priority pass additionally races an aging monitor on a scoped thread that lives exactly
//! as long as the pass.

mod aging;
mod round_robin;
mod sequential;

pub use aging::run_aging_monitor;

// Import engine tunables (quantum, tick latency, aging interval)
use crate::config::SchedulerConfig;
// Import discipline codes to pick the execution shape
use crate::discipline::Discipline;
// Import process identity for completion ordering
use crate::process::ProcessId;
// Import the shared queue and aging events
use crate::queue::{AgingBoost, CpuQueue};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one scheduling pass over a queue.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub queue: usize,
    pub discipline: Discipline,
    /// Ticks consumed by this pass.
    pub ticks: u64,
    /// Ids of the processes this pass finished, in completion order.
    pub completed: Vec<ProcessId>,
    /// Processes migrated away by a balancer while this pass was executing them.
    pub vacated: usize,
    /// Priority changes applied by the aging monitor during the pass.
    pub aging_boosts: Vec<AgingBoost>,
    /// The pass stopped early because the running flag was cleared.
    pub cancelled: bool,
}

/// Run the queue's discipline over every currently running process.
///
/// Returns once the queue has no running process left, or as soon as `running` is cleared.
/// Work migrated into the queue after this returns needs a fresh call.
pub fn run_discipline(queue: &CpuQueue, config: &SchedulerConfig, running: &AtomicBool) -> PassReport {
    let mut report = PassReport {
        queue: queue.index(),
        discipline: queue.discipline(),
        ticks: 0,
        completed: Vec::new(),
        vacated: 0,
        aging_boosts: Vec::new(),
        cancelled: false,
    };

    if queue.discipline().runs_to_completion() {
        sequential::run(queue, config, running, &mut report);
    } else {
        round_robin::run(queue, config, running, &mut report);
    }

    debug!(
        queue = queue.index(),
        discipline = %queue.discipline(),
        ticks = report.ticks,
        completed = report.completed.len(),
        vacated = report.vacated,
        cancelled = report.cancelled,
        "scheduling pass finished"
    );
    report
}

/// One Scheduling phase: the engine plus, for Priority queues, a supervised aging monitor.
///
/// The monitor is stopped and joined before this returns, so no background thread outlives
/// the phase that started it.
pub fn run_pass(queue: &CpuQueue, config: &SchedulerConfig, running: &AtomicBool) -> PassReport {
    if !queue.discipline().uses_aging() {
        return run_discipline(queue, config, running);
    }

    // Dropping the sender wakes the monitor out of its interval wait.
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
    thread::scope(|scope| {
        let monitor = thread::Builder::new()
            .name(format!("cpu-{}-aging", queue.index()))
            .spawn_scoped(scope, || {
                run_aging_monitor(queue, config.aging_interval, &stop_rx)
            });
        let monitor = match monitor {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(queue = queue.index(), error = %err, "failed to spawn aging monitor; running without aging");
                None
            }
        };

        let mut report = run_discipline(queue, config, running);
        drop(stop_tx);

        if let Some(handle) = monitor {
            match handle.join() {
                Ok(boosts) => report.aging_boosts = boosts,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        report
    })
}

/// Block for one tick; a zero tick does not sleep.
fn pace(tick: Duration) {
    if !tick.is_zero() {
        thread::sleep(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessRecord, ProcessStatus};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Instant;

    fn unpaced() -> SchedulerConfig {
        SchedulerConfig {
            tick: Duration::ZERO,
            ..SchedulerConfig::default()
        }
    }

    fn queue(discipline: Discipline, specs: &[(i32, i8)]) -> CpuQueue {
        let processes = specs
            .iter()
            .enumerate()
            .map(|(i, (burst, priority))| ProcessRecord::new(i as i32, &format!("p{i}"), *burst, *priority))
            .collect();
        CpuQueue::new(0, discipline, processes)
    }

    fn assert_drained(queue: &CpuQueue) {
        let snapshot = queue.snapshot();
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.remaining, 0);
        for process in &snapshot.processes {
            assert_eq!(process.burst, 0);
            assert_eq!(process.status, ProcessStatus::Finished);
        }
    }

    #[test]
    fn fcfs_runs_in_arrival_order() {
        let q = queue(Discipline::Fcfs, &[(4, 0), (2, 0), (6, 0), (8, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(true));
        assert_eq!(report.completed, vec![0, 1, 2, 3]);
        // Each process ticks until its burst drops below zero: burst / 2 + 1 ticks.
        assert_eq!(report.ticks, 3 + 2 + 4 + 5);
        assert_drained(&q);
    }

    #[test]
    fn sjf_orders_by_burst_and_keeps_ties_stable() {
        let q = queue(Discipline::Sjf, &[(6, 0), (2, 0), (6, 0), (1, 0), (2, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(true));
        assert_eq!(report.completed, vec![3, 1, 4, 0, 2]);
        assert_drained(&q);
    }

    #[test]
    fn priority_orders_ascending_and_keeps_ties_stable() {
        let q = queue(Discipline::Priority, &[(3, 5), (3, -2), (3, 5), (3, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(true));
        assert_eq!(report.completed, vec![1, 3, 0, 2]);
        assert_drained(&q);
    }

    #[test]
    fn round_robin_rotates_from_slot_zero() {
        // Round 1: p0 6->4, p1 2->0 (done), p2 4->2
        // Round 2: p0 4->2, p2 2->0 (done)
        // Round 3: p0 2->0 (done)
        let q = queue(Discipline::RoundRobin, &[(6, 0), (2, 0), (4, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(true));
        assert_eq!(report.completed, vec![1, 2, 0]);
        assert_eq!(report.ticks, 6);
        assert_drained(&q);
    }

    #[test]
    fn round_robin_skips_finished_slots() {
        let q = queue(Discipline::RoundRobin, &[(0, 0), (3, 0), (0, 0), (1, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(true));
        assert_eq!(report.completed, vec![3, 1]);
        assert_eq!(report.ticks, 3);
        assert_drained(&q);
    }

    #[test]
    fn empty_queue_completes_immediately() {
        for discipline in Discipline::ALL {
            let q = CpuQueue::new(0, discipline, Vec::new());
            let report = run_pass(&q, &SchedulerConfig::default(), &AtomicBool::new(true));
            assert_eq!(report.ticks, 0);
            assert!(report.completed.is_empty());
        }
    }

    #[test]
    fn second_pass_only_runs_new_work() {
        let q = queue(Discipline::Fcfs, &[(2, 0), (2, 0)]);
        let running = AtomicBool::new(true);
        run_discipline(&q, &unpaced(), &running);
        let again = run_discipline(&q, &unpaced(), &running);
        assert_eq!(again.ticks, 0);
        assert!(again.completed.is_empty());
        assert_drained(&q);
    }

    #[test]
    fn process_stolen_mid_execution_is_abandoned() {
        let paced = SchedulerConfig {
            tick: Duration::from_millis(1),
            ..SchedulerConfig::default()
        };
        let queues = vec![
            queue(Discipline::Fcfs, &[(60, 0), (60, 0), (4, 0), (4, 0)]),
            CpuQueue::new(1, Discipline::Fcfs, vec![ProcessRecord::new(9, "idle", 0, 0); 2]),
        ];
        let running = AtomicBool::new(true);

        let (report, outcome) = thread::scope(|scope| {
            let worker = scope.spawn(|| run_discipline(&queues[0], &paced, &running));
            // Steal only once slot 0 is being executed.
            let deadline = Instant::now() + Duration::from_secs(5);
            while queues[0].snapshot().processes[0].burst == 60 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            let outcome = crate::balancer::rebalance(&queues, 1);
            (worker.join().unwrap(), outcome)
        });

        // Half of the four running processes move, starting with the one in flight.
        assert_eq!(outcome.moved(), 2);
        assert_eq!(report.vacated, 1);
        assert_eq!(report.completed, vec![2, 3]);
        assert_drained(&queues[0]);

        let target = queues[1].snapshot();
        assert!(target.is_consistent());
        assert_eq!(target.running_ids(), vec![0, 1]);
        assert!(target.processes[0].burst < 60);
    }

    #[test]
    fn cleared_running_flag_cancels_pass() {
        let q = queue(Discipline::RoundRobin, &[(1_000_000, 0)]);
        let report = run_discipline(&q, &unpaced(), &AtomicBool::new(false));
        assert!(report.cancelled);
        assert_eq!(q.remaining(), 1);
    }

    #[test]
    fn priority_pass_supervises_aging_monitor() {
        let q = Arc::new(queue(Discipline::Priority, &[(40, 0), (40, 0)]));
        let config = SchedulerConfig {
            tick: Duration::from_millis(1),
            aging_interval: Duration::from_millis(2),
            ..SchedulerConfig::default()
        };
        let running = AtomicBool::new(true);
        let started = Instant::now();
        let report = run_pass(&q, &config, &running);

        // The pass takes at least 42 ticks, leaving the monitor room for several scans.
        assert!(started.elapsed() >= Duration::from_millis(42));
        assert!(!report.aging_boosts.is_empty());
        for boost in &report.aging_boosts {
            assert_eq!(boost.to, boost.from + 1);
        }
        assert!(running.load(Ordering::Relaxed));
        assert_drained(&q);
    }
}
