//! Run-to-completion execution shared by FCFS, SJF and Priority.
//!
//! Algorithm:
//! 1. Stable-sort the slots once (no-op for FCFS)
//! 2. Walk the slots in order, skipping finished ones
//! 3. Tick the current process until its burst would go negative
//! 4. Abandon the slot if a balancer migrated the process away mid-run

use super::{pace, PassReport};
use crate::config::SchedulerConfig;
use crate::queue::{CpuQueue, TickOutcome};
use std::sync::atomic::{AtomicBool, Ordering};

pub(super) fn run(
    queue: &CpuQueue,
    config: &SchedulerConfig,
    running: &AtomicBool,
    report: &mut PassReport,
) {
    queue.lock().order_for(queue.discipline());

    for slot in 0..queue.total() {
        // Re-read the occupant under the lock: a balancer may have refilled the slot.
        let Some(id) = queue.lock().running_id(slot) else {
            continue;
        };

        loop {
            if !running.load(Ordering::Relaxed) {
                report.cancelled = true;
                return;
            }
            pace(config.tick);

            let outcome = queue.lock().tick_to_completion(slot, id, config.quantum);
            match outcome {
                TickOutcome::Continue => report.ticks += 1,
                TickOutcome::Finished => {
                    report.ticks += 1;
                    report.completed.push(id);
                    break;
                }
                TickOutcome::Vacated => {
                    report.vacated += 1;
                    break;
                }
            }
        }
    }
}
