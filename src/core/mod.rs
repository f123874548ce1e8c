//! Core types shared by every part of the updater.
//!
//! Currently this is the error taxonomy and its user-facing rendering; see
//! [`error`] for details.

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
