//! Application layer for flipgate.
//!
//! The app layer coordinates ingested records, domain logic and rendering.
//! It does not parse CLI flags and it does not do filesystem I/O.

mod export;
mod heatmap;

pub use export::{ExportFormat, ExportUseCase, TableExportRow};
pub use flipgate_render::{render_console, render_markdown, render_markdown_template};
pub use heatmap::{HeatmapArtifact, HeatmapUseCase, heatmap_file_names, heatmap_titles};

use anyhow::Context;
use flipgate_domain::{TestHistory, calculate_fliprate_table, get_top_fliprates};
use flipgate_types::{
    FlakeReport, FliprateTable, Grouping, OutcomeRecord, REPORT_SCHEMA_V1, ReportSummary,
    ToolInfo, WindowParams,
};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

fn build_history(records: Vec<OutcomeRecord>) -> anyhow::Result<TestHistory> {
    if records.is_empty() {
        anyhow::bail!("no test records found");
    }
    let ingested = records.len();
    let history = TestHistory::from_records(records);
    tracing::debug!(
        ingested,
        kept = history.len(),
        tests = history.test_count(),
        "built test history"
    );
    Ok(history)
}

#[derive(Debug, Clone)]
pub struct FlipRateRequest {
    pub records: Vec<OutcomeRecord>,
    pub params: WindowParams,
}

/// Records in, ranked [`FlakeReport`] out.
pub struct FlipRateUseCase<C: Clock> {
    clock: C,
    tool: ToolInfo,
}

impl<C: Clock> FlipRateUseCase<C> {
    pub fn new(clock: C, tool: ToolInfo) -> Self {
        Self { clock, tool }
    }

    pub fn execute(&self, req: FlipRateRequest) -> anyhow::Result<FlakeReport> {
        let params = req.params;
        let history = build_history(req.records)?;

        let table = calculate_fliprate_table(
            &history,
            params.grouping,
            params.window_size,
            params.window_count,
        )
        .context("compute fliprate table")?;
        tracing::debug!(rows = table.len(), grouping = %params.grouping, "computed fliprate table");

        let top = get_top_fliprates(&table, params.top_n, params.precision)
            .context("rank fliprates")?;

        let summary = ReportSummary {
            record_count: history.len() as u64,
            test_count: history.test_count() as u64,
            row_count: table.len() as u64,
        };

        Ok(FlakeReport {
            schema: REPORT_SCHEMA_V1.to_string(),
            tool: self.tool.clone(),
            generated_at: self.clock.now_rfc3339(),
            params,
            top,
            table,
            summary,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TableRequest {
    pub records: Vec<OutcomeRecord>,
    pub grouping: Grouping,
    pub window_size: u32,
    pub window_count: u32,
}

/// Just the fliprate table, no ranking.
pub struct TableUseCase;

impl TableUseCase {
    pub fn execute(req: TableRequest) -> anyhow::Result<FliprateTable> {
        let history = build_history(req.records)?;
        let table =
            calculate_fliprate_table(&history, req.grouping, req.window_size, req.window_count)
                .context("compute fliprate table")?;
        Ok(table)
    }
}
