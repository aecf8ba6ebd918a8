//! Log output for test runs.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "tfkit=info,warn";

/// Install a test-friendly subscriber.
///
/// Output goes through the test writer so it is captured per test. `RUST_LOG`
/// overrides the default filter. Calling this more than once, or after another
/// subscriber was installed, is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer().with_target(false))
        .with(filter)
        .try_init();
}
