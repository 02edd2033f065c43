//! Aging monitor for Priority queues.
//!
//! Every interval the most favored running process (smallest priority value, first slot on
//! ties) has its priority value incremented by one. The scan and the update happen under the
//! queue lock, so the monitor never races the executing worker or a balancer.

use crate::queue::{AgingBoost, CpuQueue};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::debug;

/// Run aging scans on `queue` until it has no running process or `stop` fires.
///
/// `stop` fires on a message or on disconnection of every sender.
///
/// # Returns
/// The boosts applied, in order.
pub fn run_aging_monitor(
    queue: &CpuQueue,
    interval: Duration,
    stop: &Receiver<()>,
) -> Vec<AgingBoost> {
    let mut boosts = Vec::new();
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let Some(boost) = queue.lock().boost_most_favored(queue.index()) else {
            debug!(queue = queue.index(), "no running process left; aging monitor exiting");
            break;
        };
        debug!(
            queue = boost.queue,
            slot = boost.slot,
            id = boost.id,
            from = boost.from,
            to = boost.to,
            "aging boost"
        );
        boosts.push(boost);
    }
    boosts
}
