//! Integration test suite for relaunch
//!
//! End-to-end tests against a local HTTP server: real downloads through
//! `HttpTransfer`, release metadata through the release sources, full update
//! runs through the orchestrator, and the compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **transfer**: downloads, file naming, progress and cancellation
//! - **release**: JSON endpoint and GitHub release sources
//! - **orchestrator**: check and update over HTTP, rollback
//! - **cli**: the `relaunch` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod orchestrator;
mod release;
mod transfer;
