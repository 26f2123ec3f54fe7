//! Flipgate workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs` and the
//! cross-crate pipeline tests in `tests/integration/`.
//!
//! The actual flipgate functionality is in the workspace member crates:
//! - `flipgate-types`: Shared types and JSON schemas
//! - `flipgate-domain`: Fliprate, windowing, EWM and ranking logic
//! - `flipgate-ingest`: JUnit XML and CSV readers
//! - `flipgate-config`: `flipgate.toml` loading and flag merging
//! - `flipgate-render`: Console, Markdown and heatmap PNG output
//! - `flipgate-app`: Application use cases
//! - `flipgate-cli`: CLI interface (`flipgate` binary)
