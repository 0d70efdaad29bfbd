//! Tracing setup for flowline pipelines.
//!
//! Pipelines emit structured `tracing` events (pipeline name, run id, stage
//! name, position, elapsed millis) at every lifecycle point. This module
//! wires those events to a subscriber; callers embedding flowline in a
//! larger application will usually install their own subscriber instead.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Safe to call more than once;
/// later calls are no-ops when a global subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
