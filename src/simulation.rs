//! Simulation orchestration.
//!
//! One named OS thread (`cpu-<index>`) per queue drives that queue through a small state
//! machine:
//!
//! ```text
//! Scheduling --pass returns--> Balancing --stole work--> Scheduling
//!     ^                            |
//!     |                            +--nothing to steal--> IdleWaiting --one tick--+
//!     +------------------------------------------------------------------------+
//! ```
//!
//! Every Scheduling phase first checks global completion (all queues drained) and moves the
//! worker to Done when it holds. Observers can follow the run through [`SimEvent`]s and stop
//! it early through a [`StopHandle`].

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::balancer::{rebalance, BalanceOutcome, BalanceReport};
use crate::config::{QueueAssignment, SchedulerConfig};
use crate::error::SimulationError;
use crate::partition::partition;
use crate::process::ProcessRecord;
use crate::queue::{AgingBoost, CpuQueue, QueueSnapshot};
use crate::report::{SimulationReport, WorkerStats};
use crate::scheduler::{run_pass, PassReport};
use crate::threading::{core_for_queue, pin_current_thread};

/// Progress notifications published while the simulation runs.
#[derive(Debug, Clone, Serialize)]
pub enum SimEvent {
    PassCompleted(PassReport),
    AgingBoost(AgingBoost),
    Rebalanced(BalanceReport),
    WorkerDone(WorkerStats),
}

/// Cloneable handle that asks every worker to stop at its next tick.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        !self.running.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerPhase {
    Scheduling,
    Balancing,
    IdleWaiting,
    Done,
}

/// A set of CPU queues ready to be run by one worker each.
pub struct Simulation {
    config: SchedulerConfig,
    queues: Arc<[CpuQueue]>,
    running: Arc<AtomicBool>,
    events_tx: Sender<SimEvent>,
    events_rx: Receiver<SimEvent>,
}

impl Simulation {
    /// Build a simulation from queues already indexed `0..n` in order.
    pub fn new(config: SchedulerConfig, queues: Vec<CpuQueue>) -> Self {
        debug_assert!(
            queues.iter().enumerate().all(|(i, q)| q.index() == i),
            "queues must be indexed by position"
        );
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            queues: queues.into(),
            running: Arc::new(AtomicBool::new(true)),
            events_tx,
            events_rx,
        }
    }

    /// Split `records` across one queue per assignment, in proportion to the weights.
    ///
    /// Records are handed out contiguously in file order: queue 0 gets the first share,
    /// queue 1 the next, and so on.
    pub fn from_workload(
        config: SchedulerConfig,
        records: Vec<ProcessRecord>,
        assignments: &[QueueAssignment],
    ) -> Self {
        let weights: Vec<f64> = assignments.iter().map(|a| a.weight).collect();
        let counts = partition(records.len(), &weights);

        let mut records = records.into_iter();
        let queues = assignments
            .iter()
            .zip(counts)
            .enumerate()
            .map(|(index, (assignment, count))| {
                let processes: Vec<ProcessRecord> = records.by_ref().take(count).collect();
                info!(
                    queue = index,
                    discipline = %assignment.discipline,
                    processes = processes.len(),
                    "delegated processes"
                );
                CpuQueue::new(index, assignment.discipline, processes)
            })
            .collect();
        Self::new(config, queues)
    }

    pub fn queues(&self) -> &[CpuQueue] {
        &self.queues
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn snapshots(&self) -> Vec<QueueSnapshot> {
        self.queues.iter().map(CpuQueue::snapshot).collect()
    }

    /// Subscribe to progress events. Events are only buffered while a subscriber exists,
    /// and the stream ends once [`Simulation::run`] returns.
    pub fn events(&self) -> Receiver<SimEvent> {
        self.events_rx.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Whether every queue has run out of running processes.
    pub fn is_complete(&self) -> bool {
        all_drained(&self.queues)
    }

    /// Run every worker to global completion (or until stopped) and collect the results.
    pub fn run(self) -> Result<SimulationReport, SimulationError> {
        let Simulation {
            config,
            queues,
            running,
            events_tx,
            events_rx,
        } = self;
        // Sends only fail (and are dropped) once no subscriber holds a receiver.
        drop(events_rx);

        let started = Instant::now();
        info!(queues = queues.len(), quantum = config.quantum, "starting simulation");

        let mut handles: Vec<(usize, JoinHandle<WorkerStats>)> = Vec::with_capacity(queues.len());
        let mut spawn_error = None;
        for index in 0..queues.len() {
            let worker = Worker {
                index,
                config: config.clone(),
                queues: queues.clone(),
                running: running.clone(),
                events: events_tx.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("cpu-{index}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push((index, handle)),
                Err(source) => {
                    warn!(queue = index, error = %source, "failed to spawn worker; stopping simulation");
                    running.store(false, Ordering::Relaxed);
                    spawn_error = Some(SimulationError::Spawn { queue: index, source });
                    break;
                }
            }
        }
        drop(events_tx);

        let mut workers = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (index, handle) in handles {
            match handle.join() {
                Ok(stats) => workers.push(stats),
                Err(_) => {
                    warn!(queue = index, "worker panicked");
                    panicked.get_or_insert(SimulationError::WorkerPanicked { queue: index });
                }
            }
        }
        if let Some(err) = spawn_error.or(panicked) {
            return Err(err);
        }

        let report = SimulationReport {
            cancelled: workers.iter().any(|w| w.cancelled) || !all_drained(&queues),
            workers,
            elapsed: started.elapsed(),
            queues: queues.iter().map(CpuQueue::snapshot).collect(),
        };
        info!(
            completed = report.total_completed(),
            ticks = report.total_ticks(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            cancelled = report.cancelled,
            "simulation finished"
        );
        Ok(report)
    }
}

/// Global completion check over one consistent view of every queue.
///
/// All locks are held together, taken in ascending index order like the balancer's, so a
/// steal in flight can never make two half-observed queues both look empty.
fn all_drained(queues: &[CpuQueue]) -> bool {
    let guards: Vec<_> = queues.iter().map(CpuQueue::lock).collect();
    guards.iter().all(|state| state.remaining == 0)
}

/// Everything one worker thread owns.
struct Worker {
    index: usize,
    config: SchedulerConfig,
    queues: Arc<[CpuQueue]>,
    running: Arc<AtomicBool>,
    events: Sender<SimEvent>,
}

impl Worker {
    fn run(self) -> WorkerStats {
        // A dead worker leaves its queue undrained, so the others must not wait for it.
        let _guard = StopOnPanic(&self.running);

        if self.config.pin_cores {
            let core = core_for_queue(self.index);
            if pin_current_thread(core) {
                debug!(queue = self.index, core, "pinned worker");
            } else {
                warn!(queue = self.index, core, "failed to pin worker to core");
            }
        }

        let queue = &self.queues[self.index];
        let mut stats = WorkerStats::new(self.index, queue.discipline());
        let mut phase = WorkerPhase::Scheduling;

        while phase != WorkerPhase::Done {
            phase = match phase {
                WorkerPhase::Scheduling => self.schedule(queue, &mut stats),
                WorkerPhase::Balancing => self.balance(queue, &mut stats),
                WorkerPhase::IdleWaiting => {
                    stats.idle_waits += 1;
                    if self.config.tick.is_zero() {
                        thread::yield_now();
                    } else {
                        thread::sleep(self.config.tick);
                    }
                    WorkerPhase::Scheduling
                }
                WorkerPhase::Done => WorkerPhase::Done,
            };
        }

        debug!(
            queue = self.index,
            passes = stats.passes,
            completed = stats.completed,
            migrated_in = stats.migrated_in,
            "worker done"
        );
        self.publish(SimEvent::WorkerDone(stats.clone()));
        stats
    }

    fn schedule(&self, queue: &CpuQueue, stats: &mut WorkerStats) -> WorkerPhase {
        if !self.running.load(Ordering::Relaxed) {
            stats.cancelled = true;
            return WorkerPhase::Done;
        }
        if all_drained(&self.queues) {
            return WorkerPhase::Done;
        }
        if queue.remaining() == 0 {
            return WorkerPhase::Balancing;
        }

        let pass = run_pass(queue, &self.config, &self.running);
        stats.record_pass(&pass);
        let cancelled = pass.cancelled;
        for boost in &pass.aging_boosts {
            self.publish(SimEvent::AgingBoost(boost.clone()));
        }
        self.publish(SimEvent::PassCompleted(pass));

        if cancelled {
            WorkerPhase::Done
        } else {
            WorkerPhase::Balancing
        }
    }

    fn balance(&self, queue: &CpuQueue, stats: &mut WorkerStats) -> WorkerPhase {
        if let BalanceOutcome::Migrated(report) = rebalance(&self.queues, self.index) {
            if !report.moved.is_empty() {
                stats.record_rebalance(&report);
                self.publish(SimEvent::Rebalanced(report));
                return WorkerPhase::Scheduling;
            }
        }

        if all_drained(&self.queues) {
            WorkerPhase::Done
        } else if queue.remaining() == 0 {
            WorkerPhase::IdleWaiting
        } else {
            WorkerPhase::Scheduling
        }
    }

    fn publish(&self, event: SimEvent) {
        // No subscriber left; the event is simply not observed.
        let _ = self.events.send(event);
    }
}

struct StopOnPanic<'a>(&'a AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(false, Ordering::Relaxed);
        }
    }
}
