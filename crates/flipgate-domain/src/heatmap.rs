use flipgate_types::{FliprateRow, FliprateTable, WindowKey};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapRow {
    pub test_identifier: String,
    /// One cell per column of the owning matrix; `None` where the test has no
    /// row for that window.
    pub cells: Vec<Option<f64>>,
}

/// Tests × windows matrix ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapMatrix {
    pub windows: Vec<WindowKey>,
    pub rows: Vec<HeatmapRow>,
}

impl HeatmapMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.windows.is_empty()
    }

    pub fn cell(&self, test_identifier: &str, window: WindowKey) -> Option<f64> {
        let column = self.windows.iter().position(|w| *w == window)?;
        self.rows
            .iter()
            .find(|row| row.test_identifier == test_identifier)
            .and_then(|row| row.cells.get(column).copied().flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapTables {
    pub normal_table: HeatmapMatrix,
    pub ewm_table: HeatmapMatrix,
}

fn pivot(
    table: &FliprateTable,
    windows: &[WindowKey],
    identifiers: &BTreeSet<String>,
    value: impl Fn(&FliprateRow) -> f64,
) -> HeatmapMatrix {
    let column: BTreeMap<WindowKey, usize> = windows
        .iter()
        .enumerate()
        .map(|(idx, window)| (*window, idx))
        .collect();

    let mut rows: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for row in table
        .rows
        .iter()
        .filter(|row| identifiers.contains(&row.test_identifier))
    {
        let cells = rows
            .entry(row.test_identifier.as_str())
            .or_insert_with(|| vec![None; windows.len()]);
        if let Some(&idx) = column.get(&row.window) {
            cells[idx] = Some(value(row));
        }
    }

    HeatmapMatrix {
        windows: windows.to_vec(),
        rows: rows
            .into_iter()
            .map(|(test_identifier, cells)| HeatmapRow {
                test_identifier: test_identifier.to_string(),
                cells,
            })
            .collect(),
    }
}

/// Pivot the table into one matrix per ranking.
///
/// Both matrices share the same columns: every window present anywhere in
/// the table, ascending. Rows are the requested identifiers that appear in
/// the table, ascending.
pub fn get_image_tables_from_fliprate_table(
    table: &FliprateTable,
    top_identifiers: &BTreeSet<String>,
    top_identifiers_ewm: &BTreeSet<String>,
) -> HeatmapTables {
    let windows = table.windows();
    HeatmapTables {
        normal_table: pivot(table, &windows, top_identifiers, |row| row.flip_rate),
        ewm_table: pivot(table, &windows, top_identifiers_ewm, |row| row.flip_rate_ewm),
    }
}
