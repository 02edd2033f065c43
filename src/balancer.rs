//! Work stealing between CPU queues.
//!
//! A worker whose pass just ended pulls unfinished processes from the busiest other queue
//! into its own finished slots. Both queue locks are held for the whole copy and are always
//! taken in ascending queue index order, so two balancers can never deadlock each other.
//!
//! Algorithm:
//! 1. Pick the source: the other queue with the most remaining work, lowest index on ties
//! 2. Lock both queues and re-check that the source still has more than one process left
//! 3. Size the move to half the source's remaining work, capped by the target's capacity
//! 4. Pair target finished slots with source running slots, both in index order

// Import the shared queues and their locked state
use crate::queue::{CpuQueue, QueueSnapshot, QueueState};
use crate::process::ProcessId;
use serde::Serialize;
use tracing::{debug, info};

/// One record copied from a source slot into a target slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub source_slot: usize,
    pub target_slot: usize,
    pub id: ProcessId,
}

/// What a completed migration did, with both queues captured before and after.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub source: usize,
    pub target: usize,
    /// Number of migrations the sizing rule asked for.
    pub planned: usize,
    /// Migrations actually performed (fewer than `planned` when slots ran out).
    pub moved: Vec<Migration>,
    pub source_before: QueueSnapshot,
    pub target_before: QueueSnapshot,
    pub source_after: QueueSnapshot,
    pub target_after: QueueSnapshot,
}

/// Result of one [`rebalance`] call.
#[derive(Debug, Clone, Serialize)]
pub enum BalanceOutcome {
    /// No other queue has remaining work.
    NoSource,
    /// The busiest queue has a single process left; it keeps it.
    SourceTooSmall { source: usize },
    Migrated(BalanceReport),
}

impl BalanceOutcome {
    /// Number of processes moved into the target.
    pub fn moved(&self) -> usize {
        match self {
            BalanceOutcome::Migrated(report) => report.moved.len(),
            _ => 0,
        }
    }
}

/// Index of the queue with the largest remaining count, excluding `exclude`.
///
/// Ties go to the lowest index. Returns `None` when every other queue is drained.
pub fn busiest_queue(queues: &[CpuQueue], exclude: usize) -> Option<usize> {
    let mut busiest = None;
    let mut max_remaining = 0;
    for (index, queue) in queues.iter().enumerate() {
        if index == exclude {
            continue;
        }
        let remaining = queue.remaining();
        if remaining > max_remaining {
            max_remaining = remaining;
            busiest = Some(index);
        }
    }
    busiest
}

/// Number of processes to move from a source with `source_remaining` running out of
/// `source_total` slots into a target of `target_total` slots.
pub fn migration_size(source_total: usize, source_remaining: usize, target_total: usize) -> usize {
    let source_half = source_total.saturating_sub(source_remaining / 2);
    let to_copy = source_total.saturating_sub(source_half);
    to_copy.min(target_total)
}

/// Steal work for queue `target` from the busiest other queue.
///
/// `queues` must be indexed by queue index.
pub fn rebalance(queues: &[CpuQueue], target: usize) -> BalanceOutcome {
    let Some(target_queue) = queues.get(target) else {
        return BalanceOutcome::NoSource;
    };
    let Some(source) = busiest_queue(queues, target) else {
        return BalanceOutcome::NoSource;
    };
    let source_queue = &queues[source];

    let (mut low, mut high) = if source < target {
        (source_queue.lock(), target_queue.lock())
    } else {
        (target_queue.lock(), source_queue.lock())
    };
    let (src, dst): (&mut QueueState, &mut QueueState) = if source < target {
        (&mut *low, &mut *high)
    } else {
        (&mut *high, &mut *low)
    };

    // The counts read during selection may be stale by now.
    match src.remaining {
        0 => return BalanceOutcome::NoSource,
        1 => {
            debug!(source, target, "busiest queue has a single process left; not stealing");
            return BalanceOutcome::SourceTooSmall { source };
        }
        _ => {}
    }

    let planned = migration_size(source_queue.total(), src.remaining, target_queue.total());
    let source_before = source_queue.snapshot_locked(src);
    let target_before = target_queue.snapshot_locked(dst);

    let moved = migrate(src, dst, planned);
    src.debug_check();
    dst.debug_check();

    let report = BalanceReport {
        source,
        target,
        planned,
        moved,
        source_before,
        target_before,
        source_after: source_queue.snapshot_locked(src),
        target_after: target_queue.snapshot_locked(dst),
    };
    info!(
        source,
        target,
        planned,
        moved = report.moved.len(),
        "rebalanced queues"
    );
    BalanceOutcome::Migrated(report)
}

fn migrate(src: &mut QueueState, dst: &mut QueueState, planned: usize) -> Vec<Migration> {
    let mut moved = Vec::with_capacity(planned);
    let mut source_cursor = 0;

    for target_slot in 0..dst.slots.len() {
        if moved.len() == planned {
            break;
        }
        if dst.slots[target_slot].is_running() {
            continue;
        }
        let Some(source_slot) = (source_cursor..src.slots.len()).find(|&i| src.slots[i].is_running())
        else {
            break;
        };
        source_cursor = source_slot + 1;

        let record = src.slots[source_slot].clone();
        let id = record.id;
        dst.slots[target_slot] = record;
        src.slots[source_slot].finish();
        src.remaining -= 1;
        dst.remaining += 1;
        moved.push(Migration {
            source_slot,
            target_slot,
            id,
        });
    }
    moved
}
