//! Diagnostics helpers: uniform error text and log setup.
//!
//! Library code reports through `tracing`; only the binary decides where the
//! events go (see [`init_logging`]).

use tracing_subscriber::EnvFilter;

/// Prefix used for every user-facing error line.
const ERROR_PREFIX: &str = "smartify";

/// Format an error message the same way everywhere.
pub fn error_message(msg: impl AsRef<str>) -> String {
    format!("{}: {}", ERROR_PREFIX, msg.as_ref())
}

/// Emit a warning that does not stop the current operation.
pub fn warn(msg: impl AsRef<str>) {
    tracing::warn!("{}", msg.as_ref());
}

/// Map a `-v` count to a default filter directive.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbose)));

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_message_is_prefixed() {
        assert_eq!(error_message("bad field"), "smartify: bad field");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), "warn");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }
}
