//! Test utilities for relaunch
//!
//! Helpers shared by unit tests and the integration suite (through the
//! `test-utils` feature):
//!
//! - [`ZipFixture`] - builds zip archives in memory
//! - [`AppTree`] - a temporary install with a launcher, an auxiliary file and
//!   a config file
//! - [`FakeSource`] / [`FakeTransfer`] - in-memory release source and transfer
//!
//! # Example
//!
//! ```rust,no_run
//! use relaunch::test_utils::{AppTree, ZipFixture};
//!
//! let tree = AppTree::new("1.0.0");
//! let archive = tree.full_release("1.0.1").write(&tree.root().join("app1.0.1.zip"));
//! assert!(archive.exists());
//! ```

mod fakes;
mod fixtures;

pub use fakes::{FakeSource, FakeTransfer};
pub use fixtures::{AppTree, ZipFixture, release_at};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with optional level.
///
/// Logging is off unless a level is passed or `RUST_LOG` is set. Output goes
/// through the test writer so `cargo test` captures it per test.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
