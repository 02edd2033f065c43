//! CPU affinity helpers for the simulated CPU workers.

/// Number of host cores a worker can be pinned to (at least one).
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Host core assigned to simulated CPU `queue` when pinning is enabled.
///
/// Workers wrap around the host cores, so more queues than cores share cores round-robin.
pub fn core_for_queue(queue: usize) -> usize {
    queue % available_cores()
}

/// Attempt to pin the current thread to a specific core.
///
/// Restricts the calling worker to one host core, so each simulated CPU keeps a stable
/// cache footprint while it ticks.
///
/// # Platform Support
/// - **Linux**: Uses `pthread_setaffinity_np` to pin the thread to `core_id`
/// - **Other platforms**: No-op
///
/// # Arguments
/// * `core_id` - CPU core ID to pin the thread to (0-indexed)
///
/// # Returns
/// `true` if the affinity was applied. Pinning may be refused without the right
/// capabilities; callers treat that as a warning, not an error.
pub fn pin_current_thread(core_id: usize) -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{cpu_set_t, pthread_self, pthread_setaffinity_np, CPU_SET, CPU_SETSIZE, CPU_ZERO};

        if core_id >= CPU_SETSIZE as usize {
            return false;
        }
        // SAFETY: `set` is a zero-initialized plain C struct and `core_id` is bounded by
        // CPU_SETSIZE; the call only reads `set` for the calling thread.
        unsafe {
            let mut set: cpu_set_t = std::mem::zeroed();
            CPU_ZERO(&mut set);
            CPU_SET(core_id, &mut set);
            pthread_setaffinity_np(pthread_self(), std::mem::size_of::<cpu_set_t>(), &set) == 0
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = core_id;
        false
    }
}
