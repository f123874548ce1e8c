//! Integration test suite for youtrack-updater
//!
//! End-to-end tests that drive the binary and the upgrade pipeline against a
//! mock registry. No container engine is needed: engine calls are either
//! never reached or go to a recording fake.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: binary surface, exit codes, error output
//! - **upgrade_flow**: full upgrade against a mock registry and a fake engine

mod cli;
mod upgrade_flow;
