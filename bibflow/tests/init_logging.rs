//! One-time tracing setup for the integration test binary.
//!
//! Declared as `mod init_logging;` by each `tests/` file that wants the
//! library's `tracing` events (graph traversal, chat usage, vocabulary
//! fetches) on the test console. The subscriber installs itself before the
//! test harness runs, honors `RUST_LOG`, and stays quiet at `warn` when the
//! variable is unset:
//!
//! ```bash
//! RUST_LOG=bibflow=debug cargo test -p bibflow -- --nocapture
//! ```

use ctor::ctor;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const QUIET: &str = "warn";

#[ctor]
fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET));
    let layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_filter(filter);
    let _ = tracing_subscriber::registry().with(layer).try_init();
}
