//! Run statistics and the human-readable / JSON renderings printed by the binary.
//!
//! Workers accumulate [`WorkerStats`] while they run; the orchestrator folds them into a
//! [`SimulationReport`] together with the final queue snapshots. Tables are rendered into
//! `String`s so callers decide where they go (stdout for the binary, assertions in tests).

use crate::balancer::BalanceReport;
use crate::discipline::Discipline;
use crate::queue::{AgingBoost, QueueSnapshot};
use crate::scheduler::PassReport;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Per-worker counters.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub queue: usize,
    pub discipline: Discipline,
    /// Scheduling phases run.
    pub passes: u64,
    pub ticks: u64,
    /// Processes finished by this worker.
    pub completed: usize,
    /// Processes stolen into this worker's queue.
    pub migrated_in: usize,
    /// Processes stolen out from under this worker while it was executing them.
    pub vacated: usize,
    pub rebalances: u64,
    pub aging_boosts: usize,
    pub idle_waits: u64,
    pub cancelled: bool,
}

impl WorkerStats {
    pub fn new(queue: usize, discipline: Discipline) -> Self {
        Self {
            queue,
            discipline,
            passes: 0,
            ticks: 0,
            completed: 0,
            migrated_in: 0,
            vacated: 0,
            rebalances: 0,
            aging_boosts: 0,
            idle_waits: 0,
            cancelled: false,
        }
    }

    /// Fold one finished pass into the counters.
    pub fn record_pass(&mut self, pass: &PassReport) {
        self.passes += 1;
        self.ticks += pass.ticks;
        self.completed += pass.completed.len();
        self.vacated += pass.vacated;
        self.aging_boosts += pass.aging_boosts.len();
        self.cancelled |= pass.cancelled;
    }

    pub fn record_rebalance(&mut self, report: &BalanceReport) {
        self.rebalances += 1;
        self.migrated_in += report.moved.len();
    }
}

/// Outcome of a whole simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub workers: Vec<WorkerStats>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// The run was stopped before every process finished.
    pub cancelled: bool,
    pub queues: Vec<QueueSnapshot>,
}

impl SimulationReport {
    pub fn total_completed(&self) -> usize {
        self.workers.iter().map(|w| w.completed).sum()
    }

    pub fn total_ticks(&self) -> u64 {
        self.workers.iter().map(|w| w.ticks).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Banner used above every queue table.
pub fn queue_header(index: usize) -> String {
    format!("====================[CPU {index}]====================")
}

/// Table of which queue got which discipline and how many processes.
pub fn render_delegation(queues: &[QueueSnapshot]) -> String {
    let mut out = String::from("Delegating processes to processors:\n");
    let _ = writeln!(out, "{:<10} {:<22} {:>9}", "Processor", "Scheduling Algorithm", "Processes");
    for queue in queues {
        let _ = writeln!(
            out,
            "{:<10} {:<22} {:>9}",
            queue.index,
            queue.discipline.name(),
            queue.total
        );
    }
    out
}

/// Slot-by-slot contents of one queue.
pub fn render_queue(queue: &QueueSnapshot) -> String {
    let mut out = queue_header(queue.index);
    out.push('\n');
    let _ = writeln!(
        out,
        "{:>4} {:>8} {:<16} {:>6} {:>7} {:>6} {:>10} {:>14} {:>5} {:>5}",
        "Slot", "Priority", "Name", "ID", "Status", "Burst", "Base", "Limit", "Type", "Files"
    );
    for (slot, process) in queue.processes.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4} {:>8} {:<16} {:>6} {:>7} {:>6} {:>10} {:>14} {:>5} {:>5}",
            slot,
            process.priority,
            truncate(&process.name.as_str(), 16),
            process.id,
            process.status.as_byte(),
            process.burst,
            process.base_register,
            process.limit_register,
            process.process_type,
            process.file_count
        );
    }
    let _ = writeln!(
        out,
        "{} running of {} ({})",
        queue.remaining,
        queue.total,
        queue.discipline.label()
    );
    out
}

/// Before/after view of both queues touched by a migration.
pub fn render_rebalance(report: &BalanceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CPU {} is empty", report.target);
    let _ = writeln!(
        out,
        "Moving {} tasks from the busiest CPU (CPU {}), {} moved",
        report.planned,
        report.source,
        report.moved.len()
    );
    for (label, source, target) in [
        ("Before", &report.source_before, &report.target_before),
        ("After", &report.source_after, &report.target_after),
    ] {
        let _ = writeln!(out, "{label}");
        let _ = writeln!(out, "\tFrom");
        out.push_str(&render_queue(source));
        let _ = writeln!(out, "\n\tTo");
        out.push_str(&render_queue(target));
    }
    out
}

pub fn render_aging(boost: &AgingBoost) -> String {
    format!(
        "CPU {}: incrementing highest priority process ({}) from {} to {} to prevent starvation",
        boost.queue, boost.name, boost.from, boost.to
    )
}

/// Final per-worker summary table.
pub fn render_summary(report: &SimulationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3} {:<5} {:>6} {:>8} {:>9} {:>8} {:>8} {:>7} {:>6}",
        "CPU", "Alg", "Passes", "Ticks", "Completed", "Stolen", "Vacated", "Boosts", "Idle"
    );
    for worker in &report.workers {
        let _ = writeln!(
            out,
            "{:>3} {:<5} {:>6} {:>8} {:>9} {:>8} {:>8} {:>7} {:>6}",
            worker.queue,
            worker.discipline.label(),
            worker.passes,
            worker.ticks,
            worker.completed,
            worker.migrated_in,
            worker.vacated,
            worker.aging_boosts,
            worker.idle_waits
        );
    }
    let _ = writeln!(
        out,
        "{} processes completed in {} ticks, {:.1} ms{}",
        report.total_completed(),
        report.total_ticks(),
        report.elapsed.as_secs_f64() * 1_000.0,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    out
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

pub(crate) mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    // Milliseconds as f64 keeps sub-millisecond precision
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_micros() as f64 / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRecord;
    use crate::queue::CpuQueue;

    fn snapshot() -> QueueSnapshot {
        CpuQueue::new(
            1,
            Discipline::Sjf,
            vec![
                ProcessRecord::new(7, "editor", 4, 2),
                ProcessRecord::new(8, "a-very-long-process-name", 0, 1),
            ],
        )
        .snapshot()
    }

    #[test]
    fn queue_table_lists_every_slot() {
        let table = render_queue(&snapshot());
        assert!(table.starts_with("====================[CPU 1]===================="));
        assert!(table.contains("editor"));
        assert!(table.contains("a-very-long-proc"));
        assert!(!table.contains("a-very-long-process"));
        assert!(table.contains("1 running of 2 (SJF)"));
    }

    #[test]
    fn delegation_lists_disciplines() {
        let table = render_delegation(&[snapshot()]);
        assert!(table.contains("Shortest Job First"));
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn summary_and_json() {
        let mut stats = WorkerStats::new(0, Discipline::Fcfs);
        stats.record_pass(&PassReport {
            queue: 0,
            discipline: Discipline::Fcfs,
            ticks: 14,
            completed: vec![0, 1, 2, 3],
            vacated: 0,
            aging_boosts: Vec::new(),
            cancelled: false,
        });
        let report = SimulationReport {
            workers: vec![stats],
            elapsed: Duration::from_micros(1500),
            cancelled: false,
            queues: vec![snapshot()],
        };
        assert_eq!(report.total_completed(), 4);
        assert!(render_summary(&report).contains("4 processes completed in 14 ticks"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["elapsed"], 1.5);
        assert_eq!(json["workers"][0]["ticks"], 14);
        assert_eq!(json["queues"][0]["processes"][0]["name"], "editor");
    }
}
