//! Tracing subscriber setup for the `mbql-pql` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host, or to `main` for the CLI.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global fmt subscriber, logging to stderr.
///
/// The CLI passes `logging.level` from its settings as `default_level`, so
/// compile and substitution traces follow the config file unless `RUST_LOG`
/// is set. Safe to call more than once.
pub fn init_tracing(default_level: &str) {
    let _ = INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
