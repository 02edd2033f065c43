//! provides logging helpers

use tracing_subscriber::filter;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::{prelude::*, registry};

/// initiate the global tracing subscriber
///
/// Logs go to stderr so that the tables and JSON printed on stdout stay machine-readable.
/// `RUST_LOG` overrides the default `info` level.
pub fn init() {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).init();
}
