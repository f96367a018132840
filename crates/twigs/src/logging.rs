//! Logging initialization
//!
//! Logs go to stderr so they never mix with `--json` output on stdout.
//! `TWIGS_LOG` takes an `EnvFilter` directive; without it the level is
//! `warn`, or `debug` under `--verbose`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the filter directive
pub const LOG_ENV: &str = "TWIGS_LOG";

pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialisation (e.g. from tests) is not an error worth reporting
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
