//! Cross-crate tests: ingest, domain and app wired together without the CLI.

mod pipeline;
mod sources;
