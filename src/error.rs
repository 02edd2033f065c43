//! Error types for setup (configuration, workload loading) and the simulation runtime.
//!
//! Everything that can go wrong is detected before the first worker thread starts, except
//! thread spawn failures and worker panics, which are reported by [`SimulationError`].

use std::path::PathBuf;
use thiserror::Error;

/// User-input errors detected while validating command-line configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least one scheduling code / weight pair is required")]
    NoQueues,

    #[error(
        "invalid number of arguments: got {count} code/weight values, expected an equal number of \
         scheduling codes and weights"
    )]
    MismatchedArguments { count: usize },

    #[error(
        "argument {position} ({value:?}) is invalid: must be an integer between 1-4 where \
         1 = First Come First Serve, 2 = Round Robin, 3 = Shortest Job First, 4 = Priority Scheduling"
    )]
    InvalidDiscipline { position: usize, value: String },

    #[error(
        "argument {position} ({value:?}) is invalid: must be a rational number greater than 0 and \
         less than or equal to 1"
    )]
    InvalidWeight { position: usize, value: String },

    #[error("sum of scheduling algorithm weights exceeds 1.00 (reached {sum:.4})")]
    WeightSumExceeded { sum: f64 },

    #[error("quantum must be greater than 0 (got {0})")]
    InvalidQuantum(i32),

    #[error(
        "aging interval must be greater than 0 and longer than the tick \
         (got {aging_ms} ms aging, {tick_ms} ms tick)"
    )]
    InvalidAgingInterval { aging_ms: u64, tick_ms: u64 },
}

/// Failures while reading the binary workload file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read workload file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime failures of the orchestrator itself (never of the simulated workload).
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("failed to spawn worker thread for CPU {queue}")]
    Spawn {
        queue: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread for CPU {queue} panicked")]
    WorkerPanicked { queue: usize },
}
