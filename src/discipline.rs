//! Scheduling disciplines a CPU queue can run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution-order policy of one CPU queue.
///
/// The numeric codes are the ones accepted on the command line and are stable:
/// `1` = FCFS, `2` = Round-Robin, `3` = SJF, `4` = Priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Discipline {
    Fcfs,
    RoundRobin,
    Sjf,
    Priority,
}

impl Discipline {
    /// Every discipline in code order.
    pub const ALL: [Discipline; 4] = [
        Discipline::Fcfs,
        Discipline::RoundRobin,
        Discipline::Sjf,
        Discipline::Priority,
    ];

    /// Map a command-line code to its discipline.
    ///
    /// # Returns
    /// `None` for any code outside `1..=4`.
    pub const fn from_code(code: i64) -> Option<Discipline> {
        match code {
            1 => Some(Discipline::Fcfs),
            2 => Some(Discipline::RoundRobin),
            3 => Some(Discipline::Sjf),
            4 => Some(Discipline::Priority),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Discipline::Fcfs => 1,
            Discipline::RoundRobin => 2,
            Discipline::Sjf => 3,
            Discipline::Priority => 4,
        }
    }

    /// Short label used in statistics tables.
    pub const fn label(self) -> &'static str {
        match self {
            Discipline::Fcfs => "FCFS",
            Discipline::RoundRobin => "RR",
            Discipline::Sjf => "SJF",
            Discipline::Priority => "PRI",
        }
    }

    /// Full name used in the delegation table.
    pub const fn name(self) -> &'static str {
        match self {
            Discipline::Fcfs => "First Come First Serve",
            Discipline::RoundRobin => "Round Robin",
            Discipline::Sjf => "Shortest Job First",
            Discipline::Priority => "Priority",
        }
    }

    /// Whether a pass of this discipline races an aging monitor.
    pub const fn uses_aging(self) -> bool {
        matches!(self, Discipline::Priority)
    }

    /// Whether the queue runs one process to completion before starting the next.
    ///
    /// Only round-robin interleaves processes; the other three differ solely in the order
    /// the slots are sorted into before the pass starts.
    pub const fn runs_to_completion(self) -> bool {
        !matches!(self, Discipline::RoundRobin)
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
