//! Logging setup for the `termrec` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Default filter when neither `--log-level` nor `TERMREC_LOG` is given.
pub const DEFAULT_LEVEL: &str = "warn";

/// Install a stderr subscriber filtered by `level` (an `EnvFilter` directive).
///
/// An invalid directive falls back to [`DEFAULT_LEVEL`]. Returns `false` if
/// a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("warning: invalid log level '{level}': {e}");
        EnvFilter::new(DEFAULT_LEVEL)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        init("debug");
        assert!(!init("not a [valid filter"));
    }
}
