//! Cross-platform utilities and helpers
//!
//! - [`fs`] - atomic file writes
//! - [`platform`] - home directory, path expansion, command lookup
//! - [`progress`] - spinner for network waits

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, safe_write};
pub use platform::{command_exists, resolve_path};
pub use progress::{ProgressBar, disable_progress, spinner_with_message};
