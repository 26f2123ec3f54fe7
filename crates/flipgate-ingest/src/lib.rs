//! Ingestion for flipgate.
//!
//! Turns JUnit XML directories and history CSV files into
//! [`OutcomeRecord`]s. Nothing here filters or sorts: that is the
//! domain's job once the records become a `TestHistory`.

mod csv;
mod junit;
mod timestamp;

pub use csv::{parse_history_csv, read_history_csv};
pub use junit::{parse_junit_xml, read_junit_dir};
pub use timestamp::parse_timestamp;

use flipgate_types::OutcomeRecord;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid glob pattern")]
    Pattern(#[from] glob::PatternError),

    #[error("line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("missing required column `{0}` in CSV header")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid timestamp {value:?}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("{}: malformed XML", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{}: unexpected root element <{root}>, expected <testsuites> or <testsuite>", path.display())]
    UnexpectedRoot { path: PathBuf, root: String },

    #[error("{}: testsuite {suite:?} has no timestamp", path.display())]
    MissingSuiteTimestamp { path: PathBuf, suite: String },

    #[error("{}: testsuite {suite:?} has invalid timestamp {value:?}", path.display())]
    InvalidSuiteTimestamp {
        path: PathBuf,
        suite: String,
        value: String,
    },

    #[error("{}: testcase without a name attribute", path.display())]
    MissingTestName { path: PathBuf },
}

/// Where a test history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySource {
    /// Directory of JUnit XML reports, one or more per CI run.
    JunitDir(PathBuf),
    /// CSV with `timestamp,test_identifier,test_status` columns.
    Csv(PathBuf),
}

impl HistorySource {
    pub fn path(&self) -> &Path {
        match self {
            HistorySource::JunitDir(p) | HistorySource::Csv(p) => p,
        }
    }

    pub fn load(&self) -> Result<Vec<OutcomeRecord>, IngestError> {
        match self {
            HistorySource::JunitDir(dir) => read_junit_dir(dir),
            HistorySource::Csv(path) => read_history_csv(path),
        }
    }
}

fn read_file(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
