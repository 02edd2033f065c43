//! Per-CPU process queue shared between its worker, its aging monitor and the balancers.
//!
//! All mutable state lives behind one `parking_lot::Mutex`. Every multi-step access to a
//! process record (tick, aging boost, migration) happens while that lock is held, so the
//! remaining-count invariant is never observable in a torn state.

use crate::discipline::Discipline;
use crate::process::{ProcessId, ProcessRecord};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;

/// One simulated CPU.
#[derive(Debug)]
pub struct CpuQueue {
    index: usize,
    discipline: Discipline,
    total: usize,
    state: Mutex<QueueState>,
}

impl CpuQueue {
    /// Create a queue owning `processes`. Capacity is fixed to `processes.len()`.
    pub fn new(index: usize, discipline: Discipline, mut processes: Vec<ProcessRecord>) -> Self {
        for process in &mut processes {
            process.normalize();
        }
        let remaining = processes.iter().filter(|p| p.is_running()).count();
        Self {
            index,
            discipline,
            total: processes.len(),
            state: Mutex::new(QueueState {
                slots: processes,
                remaining,
            }),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Slot capacity (constant for the life of the queue).
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of running processes currently assigned to this queue.
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    /// Copy of the queue taken under its lock.
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        self.snapshot_locked(&state)
    }

    pub(crate) fn snapshot_locked(&self, state: &QueueState) -> QueueSnapshot {
        QueueSnapshot {
            index: self.index,
            discipline: self.discipline,
            total: self.total,
            remaining: state.remaining,
            processes: state.slots.clone(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }
}

/// Result of consuming one tick on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Work remains; keep ticking this slot.
    Continue,
    /// The process finished on this tick.
    Finished,
    /// The slot no longer holds the process (migrated away by a balancer).
    Vacated,
}

/// Priority change applied by the aging monitor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgingBoost {
    pub queue: usize,
    pub slot: usize,
    pub id: ProcessId,
    pub name: String,
    pub from: i8,
    pub to: i8,
}

/// Lock-protected contents of a [`CpuQueue`].
#[derive(Debug)]
pub(crate) struct QueueState {
    pub(crate) slots: Vec<ProcessRecord>,
    /// Always equal to the number of running slots.
    pub(crate) remaining: usize,
}

impl QueueState {
    /// Id of the running process in `slot`, if any.
    pub(crate) fn running_id(&self, slot: usize) -> Option<ProcessId> {
        self.slots
            .get(slot)
            .filter(|p| p.is_running())
            .map(|p| p.id)
    }

    fn occupant_mut(&mut self, slot: usize, id: ProcessId) -> Option<&mut ProcessRecord> {
        self.slots
            .get_mut(slot)
            .filter(|p| p.id == id && p.is_running())
    }

    /// Run-to-completion tick: the process keeps its slot while the burst stays
    /// non-negative and finishes on the tick that drives it below zero.
    pub(crate) fn tick_to_completion(
        &mut self,
        slot: usize,
        id: ProcessId,
        quantum: i32,
    ) -> TickOutcome {
        let Some(process) = self.occupant_mut(slot, id) else {
            return TickOutcome::Vacated;
        };
        let next = process.burst.saturating_sub(quantum);
        if next < 0 {
            process.finish();
            self.mark_finished();
            TickOutcome::Finished
        } else {
            process.burst = next;
            TickOutcome::Continue
        }
    }

    /// Round-robin tick: the burst floors at zero and the process finishes on reaching it.
    pub(crate) fn tick_round_robin(
        &mut self,
        slot: usize,
        id: ProcessId,
        quantum: i32,
    ) -> TickOutcome {
        let Some(process) = self.occupant_mut(slot, id) else {
            return TickOutcome::Vacated;
        };
        process.burst = process.burst.saturating_sub(quantum).max(0);
        if process.burst == 0 {
            process.finish();
            self.mark_finished();
            TickOutcome::Finished
        } else {
            TickOutcome::Continue
        }
    }

    /// Increment the priority of the most favored (numerically smallest) running process.
    ///
    /// Ties go to the lowest slot index.
    ///
    /// # Returns
    /// `None` when no running process is left.
    pub(crate) fn boost_most_favored(&mut self, queue: usize) -> Option<AgingBoost> {
        let (slot, _) = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_running())
            .fold(None::<(usize, i8)>, |best, (slot, p)| match best {
                Some((_, priority)) if priority <= p.priority => best,
                _ => Some((slot, p.priority)),
            })?;
        let process = &mut self.slots[slot];
        let from = process.priority;
        process.priority = from.saturating_add(1);
        Some(AgingBoost {
            queue,
            slot,
            id: process.id,
            name: process.name.to_string(),
            from,
            to: process.priority,
        })
    }

    /// Stable sort of the slots for the run-to-completion disciplines.
    pub(crate) fn order_for(&mut self, discipline: Discipline) {
        match discipline {
            Discipline::Sjf => self.slots.sort_by_key(|p| p.burst),
            Discipline::Priority => self.slots.sort_by_key(|p| p.priority),
            Discipline::Fcfs | Discipline::RoundRobin => {}
        }
    }

    fn mark_finished(&mut self) {
        debug_assert!(self.remaining > 0, "remaining count underflow");
        self.remaining -= 1;
        self.debug_check();
    }

    /// Panic in debug builds when the remaining count diverges from the slot contents.
    pub(crate) fn debug_check(&self) {
        debug_assert_eq!(
            self.remaining,
            self.slots.iter().filter(|p| p.is_running()).count(),
            "remaining count diverged from running slots"
        );
        debug_assert!(
            self.slots.iter().all(|p| p.burst >= 0),
            "negative burst observed"
        );
    }
}

/// Read-only copy of a queue used for statistics, events and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub index: usize,
    pub discipline: Discipline,
    pub total: usize,
    pub remaining: usize,
    pub processes: Vec<ProcessRecord>,
}

impl QueueSnapshot {
    /// Number of slots whose process is still running.
    pub fn running_count(&self) -> usize {
        self.processes.iter().filter(|p| p.is_running()).count()
    }

    /// Ids of the running processes in slot order.
    pub fn running_ids(&self) -> Vec<ProcessId> {
        self.processes
            .iter()
            .filter(|p| p.is_running())
            .map(|p| p.id)
            .collect()
    }

    /// Whether the bookkeeping agrees with the slot contents.
    pub fn is_consistent(&self) -> bool {
        self.remaining == self.running_count()
            && self.remaining <= self.total
            && self.processes.len() == self.total
            && self.processes.iter().all(|p| p.burst >= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessStatus;

    fn queue(bursts: &[i32]) -> CpuQueue {
        let processes = bursts
            .iter()
            .enumerate()
            .map(|(i, b)| ProcessRecord::new(i as i32, &format!("p{i}"), *b, 0))
            .collect();
        CpuQueue::new(0, Discipline::Fcfs, processes)
    }

    #[test]
    fn construction_counts_only_live_processes() {
        let q = queue(&[4, 0, 3, -1]);
        assert_eq!(q.total(), 4);
        assert_eq!(q.remaining(), 2);
        let snap = q.snapshot();
        assert!(snap.is_consistent());
        assert_eq!(snap.processes[3].burst, 0);
        assert_eq!(snap.processes[3].status, ProcessStatus::Finished);
    }

    #[test]
    fn run_to_completion_tick_needs_burst_below_zero() {
        let q = queue(&[4]);
        let mut state = q.lock();
        assert_eq!(state.tick_to_completion(0, 0, 2), TickOutcome::Continue);
        assert_eq!(state.slots[0].burst, 2);
        assert_eq!(state.tick_to_completion(0, 0, 2), TickOutcome::Continue);
        assert_eq!(state.slots[0].burst, 0);
        assert_eq!(state.tick_to_completion(0, 0, 2), TickOutcome::Finished);
        assert_eq!(state.slots[0].burst, 0);
        assert_eq!(state.remaining, 0);
    }

    #[test]
    fn round_robin_tick_clamps_overshoot() {
        let q = queue(&[3]);
        let mut state = q.lock();
        assert_eq!(state.tick_round_robin(0, 0, 2), TickOutcome::Continue);
        assert_eq!(state.tick_round_robin(0, 0, 2), TickOutcome::Finished);
        assert_eq!(state.slots[0].burst, 0);
        assert_eq!(state.remaining, 0);
    }

    #[test]
    fn vacated_slot_is_left_untouched() {
        let q = queue(&[6, 6]);
        let mut state = q.lock();
        state.slots[0].finish();
        state.remaining -= 1;
        assert_eq!(state.tick_round_robin(0, 0, 2), TickOutcome::Vacated);
        // Slot 1 is live but holds a different process.
        assert_eq!(state.tick_to_completion(1, 99, 2), TickOutcome::Vacated);
        assert_eq!(state.remaining, 1);
        assert_eq!(state.slots[1].burst, 6);
    }

    #[test]
    fn boost_picks_smallest_running_priority_first_index() {
        let mut processes = vec![
            ProcessRecord::new(0, "a", 5, 3),
            ProcessRecord::new(1, "b", 0, -5),
            ProcessRecord::new(2, "c", 5, 1),
            ProcessRecord::new(3, "d", 5, 1),
        ];
        processes[1].status = ProcessStatus::Finished;
        let q = CpuQueue::new(2, Discipline::Priority, processes);
        let mut state = q.lock();

        let boost = state.boost_most_favored(2).unwrap();
        assert_eq!((boost.slot, boost.id, boost.from, boost.to), (2, 2, 1, 2));
        let boost = state.boost_most_favored(2).unwrap();
        assert_eq!((boost.slot, boost.from), (3, 1));
        assert_eq!(boost.queue, 2);
    }

    #[test]
    fn boost_saturates_and_stops_without_work() {
        let q = CpuQueue::new(0, Discipline::Priority, vec![ProcessRecord::new(0, "x", 1, i8::MAX)]);
        let mut state = q.lock();
        assert_eq!(state.boost_most_favored(0).unwrap().to, i8::MAX);
        state.slots[0].finish();
        state.remaining = 0;
        assert!(state.boost_most_favored(0).is_none());
    }

    #[test]
    fn ordering_is_stable() {
        let processes = vec![
            ProcessRecord::new(0, "a", 5, 2),
            ProcessRecord::new(1, "b", 3, 1),
            ProcessRecord::new(2, "c", 5, 1),
            ProcessRecord::new(3, "d", 3, 2),
        ];
        let q = CpuQueue::new(0, Discipline::Sjf, processes);
        let mut state = q.lock();
        state.order_for(Discipline::Sjf);
        let ids: Vec<_> = state.slots.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 0, 2]);

        state.order_for(Discipline::Priority);
        let ids: Vec<_> = state.slots.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 0]);
    }
}
