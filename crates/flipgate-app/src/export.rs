//! Export use case for converting fliprate tables to CSV or JSONL formats.
//!
//! This module flattens a [`FliprateTable`] into rows suitable for
//! spreadsheets, dashboards and time-series ingestion.

use flipgate_types::FliprateTable;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// RFC 4180 compliant CSV with header row.
    Csv,
    /// JSON Lines format (one JSON object per line).
    Jsonl,
}

impl ExportFormat {
    /// Parse format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "jsonl" => Some(ExportFormat::Jsonl),
            _ => None,
        }
    }
}

/// One exported fliprate row. `window` is a run label or an ISO date.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TableExportRow {
    pub window: String,
    pub test_identifier: String,
    pub flip_rate: f64,
    pub flip_rate_ewm: f64,
}

/// Use case for exporting fliprate tables to different formats.
pub struct ExportUseCase;

impl ExportUseCase {
    pub fn export_table(table: &FliprateTable, format: ExportFormat) -> anyhow::Result<String> {
        let rows = Self::table_to_rows(table);

        match format {
            ExportFormat::Csv => Ok(Self::rows_to_csv(table, &rows)),
            ExportFormat::Jsonl => Self::rows_to_jsonl(&rows),
        }
    }

    /// Rows keep table order, which is already deterministic.
    fn table_to_rows(table: &FliprateTable) -> Vec<TableExportRow> {
        table
            .rows
            .iter()
            .map(|row| TableExportRow {
                window: row.window.to_string(),
                test_identifier: row.test_identifier.clone(),
                flip_rate: row.flip_rate,
                flip_rate_ewm: row.flip_rate_ewm,
            })
            .collect()
    }

    /// Header names the window column the way the table is grouped:
    /// `timestamp` for day windows, `window` for run windows.
    fn rows_to_csv(table: &FliprateTable, rows: &[TableExportRow]) -> String {
        let mut output = String::new();

        output.push_str(table.grouping.window_column());
        output.push_str(",test_identifier,flip_rate,flip_rate_ewm\n");

        for row in rows {
            output.push_str(&csv_escape(&row.window));
            output.push(',');
            output.push_str(&csv_escape(&row.test_identifier));
            output.push(',');
            output.push_str(&format!("{:.6}", row.flip_rate));
            output.push(',');
            output.push_str(&format!("{:.6}", row.flip_rate_ewm));
            output.push('\n');
        }

        output
    }

    fn rows_to_jsonl(rows: &[TableExportRow]) -> anyhow::Result<String> {
        let mut output = String::new();

        for row in rows {
            let json = serde_json::to_string(row)?;
            output.push_str(&json);
            output.push('\n');
        }

        Ok(output)
    }
}

/// Escape a string for CSV per RFC 4180.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
