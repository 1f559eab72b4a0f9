//! Diagnostic logging via **tracing**.
//!
//! Logs go to stderr so stdout stays reserved for reports (`--json` output
//! is always machine-parseable).

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "pua=debug"
    } else {
        "pua=warn"
    }
}

/// Initializes the global tracing subscriber.
///
/// Call once at startup. `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "pua=debug");
        assert_eq!(default_filter(false), "pua=warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(false);
        init_logging(true);
    }
}
