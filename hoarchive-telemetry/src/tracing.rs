use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Default filter directive applied when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "hoarchive_ingest=info,hoarchive_cli=info";

static TEST_TRACING: Once = Once::new();

/// Initializes tracing for a binary.
///
/// Honors `RUST_LOG` when set, otherwise enables info-level logging for the
/// hoarchive crates. Panics if a global subscriber was already installed,
/// since binaries must call this exactly once at startup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Initializes tracing for tests.
///
/// Safe to call from every test; the subscriber is installed once and later
/// calls are no-ops. Output is captured by the test harness.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("hoarchive_ingest=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
