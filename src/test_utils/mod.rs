//! Test utilities for the updater
//!
//! Helpers shared by unit tests and the integration suite:
//!
//! - [`init_test_logging`] - tracing output inside tests
//! - [`fakes`] - engine, prompt and tag source stand-ins that record calls
//! - [`fixtures`] - compose files in temporary directories
//!
//! # Example
//!
//! ```rust,no_run
//! use youtrack_updater::test_utils::{ComposeFixture, RecordingEngine};
//!
//! let fixture = ComposeFixture::with_tag("2023.1.12345").unwrap();
//! let engine = RecordingEngine::new();
//! assert!(engine.calls().is_empty());
//! # drop(fixture);
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FixedTags, LogScript, RecordingEngine, ScriptedPrompt};
pub use fixtures::ComposeFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `RUST_LOG`; does nothing when neither is
/// set. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
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
            .with_ansi(true)
            .try_init();
    });
}
