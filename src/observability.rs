//! Logging setup.
//!
//! Console output in dev, JSON elsewhere, with the level taken from
//! `RUST_LOG` when set. Event formatting beyond that is owned by whatever
//! ships the logs; this layer only emits structured records with fixed field
//! names.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::RunEnv;

/// Initialize the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops (tests initialize independently).
pub fn init(env: RunEnv) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env.is_dev() {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(RunEnv::Test);
        init(RunEnv::Test);
    }
}
