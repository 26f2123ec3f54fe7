//! Shared types for flipgate.
//!
//! Design goal: versioned, explicit, boring.
//! Records come in from ingestion, fliprate tables come out of the domain
//! crate, and reports are what we hand to CI logs and dashboards.

use rust_decimal::Decimal;
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

pub const REPORT_SCHEMA_V1: &str = "flipgate.report.v1";

/// Default number of significant digits for reported scores.
pub const DEFAULT_PRECISION: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Outcome of a single test execution.
///
/// Anything that is not `Pass` is a failure for flakiness purposes, but the
/// categories stay distinct: `failure -> error` is still a flip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum TestStatus {
    Pass,
    Failure,
    Error,
    Skipped,
    Other(String),
}

impl TestStatus {
    /// Case-insensitive parse; unknown categories are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "pass" | "passed" | "success" => TestStatus::Pass,
            "fail" | "failed" | "failure" => TestStatus::Failure,
            "error" | "errored" => TestStatus::Error,
            "skip" | "skipped" => TestStatus::Skipped,
            _ => TestStatus::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Failure => "failure",
            TestStatus::Error => "error",
            TestStatus::Skipped => "skipped",
            TestStatus::Other(s) => s,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestStatus::Skipped)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized `(timestamp, test_identifier, status)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub timestamp: PrimitiveDateTime,

    /// Exact string identity, e.g. `suite::name`.
    pub test_identifier: String,

    pub status: TestStatus,
}

impl OutcomeRecord {
    pub fn new(
        timestamp: PrimitiveDateTime,
        test_identifier: impl Into<String>,
        status: TestStatus,
    ) -> Self {
        Self {
            timestamp,
            test_identifier: test_identifier.into(),
            status,
        }
    }
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Calendar-aligned buckets of `window_size` days.
    Days,
    /// Fixed-size buckets of `window_size` runs, most recent first.
    Runs,
}

impl Grouping {
    /// Unit label used in heatmap file names (`1day_...`, `2runs_...`).
    pub fn file_label(self) -> &'static str {
        match self {
            Grouping::Days => "day",
            Grouping::Runs => "runs",
        }
    }

    /// Name of the window column in exported tables.
    pub fn window_column(self) -> &'static str {
        match self {
            Grouping::Days => "timestamp",
            Grouping::Runs => "window",
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grouping::Days => f.write_str("days"),
            Grouping::Runs => f.write_str("runs"),
        }
    }
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" | "day" => Ok(Grouping::Days),
            "runs" | "run" => Ok(Grouping::Runs),
            other => Err(format!("invalid grouping option: {other} (expected days|runs)")),
        }
    }
}

/// Label of one fliprate window.
///
/// Day windows are keyed by the bucket's left edge; run windows count up to
/// `window_count`, which is always the most recent window.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum WindowKey {
    Run(u32),
    Day(Date),
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKey::Run(n) => write!(f, "{n}"),
            WindowKey::Day(date) => {
                let s = date
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
        }
    }
}

impl JsonSchema for WindowKey {
    fn schema_name() -> Cow<'static, str> {
        "WindowKey".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "description": "Run window index (integer, 1 = oldest retained) or day bucket left edge (YYYY-MM-DD).",
            "oneOf": [
                { "type": "integer", "minimum": 1 },
                { "type": "string", "format": "date" }
            ]
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FliprateRow {
    pub window: WindowKey,
    pub test_identifier: String,

    /// Fraction of adjacent outcome pairs that differ, in `[0, 1]`.
    pub flip_rate: f64,

    /// Exponentially weighted moving average of `flip_rate` over this test's windows.
    pub flip_rate_ewm: f64,
}

/// Long-form fliprate table.
///
/// Day tables are ordered by window, then identifier; run tables by
/// identifier, then window. Either way each test's rows are window-ascending.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FliprateTable {
    pub grouping: Grouping,
    pub rows: Vec<FliprateRow>,
}

impl FliprateTable {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct windows present in the table, ascending.
    pub fn windows(&self) -> Vec<WindowKey> {
        let set: BTreeSet<WindowKey> = self.rows.iter().map(|r| r.window).collect();
        set.into_iter().collect()
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WindowParams {
    pub grouping: Grouping,

    /// Days per window or runs per window, depending on `grouping`.
    pub window_size: u32,

    /// Number of trailing windows retained.
    pub window_count: u32,

    pub top_n: u32,

    /// Significant digits of reported scores.
    pub precision: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ScoreEntry {
    pub test_identifier: String,
    pub score: Decimal,
}

/// Top-N rankings taken from each test's latest window.
///
/// Entries are ordered by descending score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TopFliprates {
    pub top_normal_scores: Vec<ScoreEntry>,
    pub top_ewm_scores: Vec<ScoreEntry>,
}

impl TopFliprates {
    pub fn normal_score(&self, test_identifier: &str) -> Option<Decimal> {
        find_score(&self.top_normal_scores, test_identifier)
    }

    pub fn ewm_score(&self, test_identifier: &str) -> Option<Decimal> {
        find_score(&self.top_ewm_scores, test_identifier)
    }

    pub fn normal_identifiers(&self) -> BTreeSet<String> {
        self.top_normal_scores
            .iter()
            .map(|e| e.test_identifier.clone())
            .collect()
    }

    pub fn ewm_identifiers(&self) -> BTreeSet<String> {
        self.top_ewm_scores
            .iter()
            .map(|e| e.test_identifier.clone())
            .collect()
    }
}

fn find_score(entries: &[ScoreEntry], test_identifier: &str) -> Option<Decimal> {
    entries
        .iter()
        .find(|e| e.test_identifier == test_identifier)
        .map(|e| e.score)
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReportSummary {
    /// Records used after skipped outcomes were dropped.
    pub record_count: u64,
    pub test_count: u64,
    pub row_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FlakeReport {
    pub schema: String,
    pub tool: ToolInfo,

    /// RFC 3339 timestamp.
    pub generated_at: String,

    pub params: WindowParams,
    pub top: TopFliprates,
    pub table: FliprateTable,
    pub summary: ReportSummary,
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<Grouping>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_count: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    /// Directory for heatmap images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
}
