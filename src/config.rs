//! Command-line surface and validated simulation configuration.
//!
//! The positional arguments mirror the classic invocation
//! `multiqueue-sched <workload> <code> <weight> [<code> <weight> ...]`; every pair creates one CPU
//! queue. All validation happens here so that a bad invocation never starts a worker.

use crate::discipline::Discipline;
use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Work units consumed per tick.
pub const DEFAULT_QUANTUM: i32 = 2;
/// Latency of one execution tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(3);
/// Period of the priority queue's aging scan.
pub const DEFAULT_AGING_INTERVAL: Duration = Duration::from_secs(2);

/// Tolerance applied to the weight-sum check so that e.g. `0.7 + 0.2 + 0.1` is accepted.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

#[derive(Parser, Debug)]
#[command(
    name = "multiqueue-sched",
    version,
    about = "Simulate per-CPU scheduling queues with aging and work stealing"
)]
pub struct Cli {
    /// Binary workload file of packed process records
    #[arg(value_name = "WORKLOAD")]
    pub workload: PathBuf,

    /// Scheduling code (1=FCFS, 2=RR, 3=SJF, 4=PRI) and weight in (0, 1], repeated per CPU
    #[arg(
        value_name = "CODE WEIGHT",
        required = true,
        num_args = 1..,
        allow_negative_numbers = true
    )]
    pub queues: Vec<String>,

    /// Work units consumed per tick
    #[arg(long, default_value_t = DEFAULT_QUANTUM)]
    pub quantum: i32,

    /// Tick latency in milliseconds (0 disables pacing)
    #[arg(long, default_value_t = DEFAULT_TICK.as_millis() as u64)]
    pub tick_ms: u64,

    /// Interval between aging scans on priority queues, in milliseconds
    #[arg(long, default_value_t = DEFAULT_AGING_INTERVAL.as_millis() as u64)]
    pub aging_interval_ms: u64,

    /// Pin each CPU worker thread to a host core (Linux only)
    #[arg(long)]
    pub pin_cores: bool,

    /// Print the final report as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// Skip the per-queue process tables
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Validated per-queue assignments, in queue index order.
    pub fn assignments(&self) -> Result<Vec<QueueAssignment>, ConfigError> {
        parse_assignments(&self.queues)
    }

    /// Validated engine tunables.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let config = SchedulerConfig {
            quantum: self.quantum,
            tick: Duration::from_millis(self.tick_ms),
            aging_interval: Duration::from_millis(self.aging_interval_ms),
            pin_cores: self.pin_cores,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Discipline and workload share of one CPU queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueAssignment {
    pub discipline: Discipline,
    pub weight: f64,
}

/// Engine tunables shared by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Burst consumed per tick.
    pub quantum: i32,
    /// Sleep per tick; zero runs unpaced.
    pub tick: Duration,
    /// Sleep between two aging scans.
    pub aging_interval: Duration,
    /// Pin worker `i` to host core `i % cores`.
    pub pin_cores: bool,
}

impl SchedulerConfig {
    /// Check the tunables a worker relies on.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidQuantum`] when the quantum is not positive
    /// - [`ConfigError::InvalidAgingInterval`] when the aging interval is zero or not longer
    ///   than the tick; the monitor would otherwise boost in a tight loop
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum <= 0 {
            return Err(ConfigError::InvalidQuantum(self.quantum));
        }
        if self.aging_interval.is_zero() || self.aging_interval <= self.tick {
            return Err(ConfigError::InvalidAgingInterval {
                aging_ms: self.aging_interval.as_millis() as u64,
                tick_ms: self.tick.as_millis() as u64,
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            tick: DEFAULT_TICK,
            aging_interval: DEFAULT_AGING_INTERVAL,
            pin_cores: false,
        }
    }
}

/// Parse alternating `code weight` values into queue assignments.
///
/// Positions in error messages count the workload path as argument 1, so the first code
/// is argument 2 and the first weight argument 3.
///
/// # Errors
/// - [`ConfigError::NoQueues`] when `values` is empty
/// - [`ConfigError::MismatchedArguments`] when a code has no weight
/// - [`ConfigError::InvalidDiscipline`] for codes outside `1..=4`
/// - [`ConfigError::InvalidWeight`] for weights outside `(0, 1]`
/// - [`ConfigError::WeightSumExceeded`] as soon as the running sum passes 1
pub fn parse_assignments<S: AsRef<str>>(values: &[S]) -> Result<Vec<QueueAssignment>, ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::NoQueues);
    }
    if values.len() % 2 != 0 {
        return Err(ConfigError::MismatchedArguments {
            count: values.len(),
        });
    }

    let mut assignments = Vec::with_capacity(values.len() / 2);
    let mut weight_sum = 0.0f64;
    for (pair_index, pair) in values.chunks_exact(2).enumerate() {
        let code_position = pair_index * 2 + 2;
        let code_raw = pair[0].as_ref();
        let weight_raw = pair[1].as_ref();

        let discipline = code_raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(Discipline::from_code)
            .ok_or_else(|| ConfigError::InvalidDiscipline {
                position: code_position,
                value: code_raw.to_string(),
            })?;

        let weight = weight_raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w > 0.0 && *w <= 1.0)
            .ok_or_else(|| ConfigError::InvalidWeight {
                position: code_position + 1,
                value: weight_raw.to_string(),
            })?;

        weight_sum += weight;
        if weight_sum > 1.0 + WEIGHT_SUM_EPSILON {
            return Err(ConfigError::WeightSumExceeded { sum: weight_sum });
        }

        assignments.push(QueueAssignment { discipline, weight });
    }
    Ok(assignments)
}
