pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

/// How long a worker-pool run may take in a test before it counts as stalled.
pub const PLAN_RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Planner and pool events at debug, everything else at warn.
const DEFAULT_TEST_FILTER: &str = "execplan=debug,execplan_test_utils=debug,warn";

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// `EXECPLAN_LOG` takes a full `EnvFilter` directive here (for example
/// `execplan::plan::builder=trace`), so a single failing scenario can be
/// traced without touching the code.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var("EXECPLAN_LOG")
            .ok()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_TEST_FILTER));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await a plan run, failing the test if it stalls past [`PLAN_RUN_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    with_timeout_of(PLAN_RUN_TIMEOUT, f).await
}

pub async fn with_timeout_of<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("plan run stalled: no result after {limit:?}"),
    }
}
