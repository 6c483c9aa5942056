pub mod builders;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Default bound for async host tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// (or with `-- --nocapture`). `SCRIPTPULSE_LOG` takes precedence over
/// `RUST_LOG`; the default keeps script chatter and drops scheduler noise:
/// `SCRIPTPULSE_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SCRIPTPULSE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn,scripting=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future under [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    with_timeout_after(TEST_TIMEOUT, f).await
}

/// Run a future, panicking if it is still pending after `limit`. A host
/// runtime that never reaches idle shows up here instead of hanging.
pub async fn with_timeout_after<F, T>(limit: Duration, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {limit:?}; runtime never went idle"),
    }
}
