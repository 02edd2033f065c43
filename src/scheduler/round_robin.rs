//! Round-robin execution: one tick per running process per visit, cursor starting at slot 0.

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
    let total = queue.total();
    if total == 0 {
        return;
    }

    let mut cursor = 0usize;
    loop {
        if !running.load(Ordering::Relaxed) {
            report.cancelled = true;
            return;
        }

        let id = {
            let state = queue.lock();
            if state.remaining == 0 {
                break;
            }
            state.running_id(cursor)
        };

        if let Some(id) = id {
            pace(config.tick);
            let outcome = queue.lock().tick_round_robin(cursor, id, config.quantum);
            match outcome {
                TickOutcome::Continue => report.ticks += 1,
                TickOutcome::Finished => {
                    report.ticks += 1;
                    report.completed.push(id);
                }
                TickOutcome::Vacated => report.vacated += 1,
            }
        }

        cursor = (cursor + 1) % total;
    }
}
