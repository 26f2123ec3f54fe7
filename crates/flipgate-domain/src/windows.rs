use crate::{DomainError, EWM_ALPHA, TestHistory, apply_ewm, calc_fliprate};
use flipgate_types::{FliprateRow, FliprateTable, Grouping, TestStatus, WindowKey};
use std::collections::BTreeMap;
use time::{Date, Duration, PrimitiveDateTime};

const SECONDS_PER_DAY: i64 = 86_400;

fn validate_window(window_size: u32, window_count: u32) -> Result<(), DomainError> {
    if window_size == 0 {
        return Err(DomainError::InvalidWindowSize);
    }
    if window_count == 0 {
        return Err(DomainError::InvalidWindowCount);
    }
    Ok(())
}

/// Smooth per test, then drop rows whose raw fliprate is exactly zero.
///
/// Smoothing runs before the filter so a calm window still pulls the average
/// of the windows that follow it.
fn finish_rows(mut rows: Vec<FliprateRow>) -> Vec<FliprateRow> {
    apply_ewm(&mut rows, EWM_ALPHA);
    rows.retain(|row| row.flip_rate != 0.0);
    rows
}

fn row(window: WindowKey, test_identifier: &str, flip_rate: f64) -> FliprateRow {
    FliprateRow {
        window,
        test_identifier: test_identifier.to_string(),
        flip_rate,
        flip_rate_ewm: flip_rate,
    }
}

/// Fliprates of the most recent `window_count` non-overlapping windows of
/// `window_size` runs each.
///
/// Windows are cut from the newest run backwards; the oldest window may be
/// short. Labels count down from `window_count` for the newest window and the
/// result is returned in ascending label order.
pub fn non_overlapping_window_fliprate<T: PartialEq>(
    runs: &[T],
    window_size: u32,
    window_count: u32,
) -> Result<Vec<(u32, f64)>, DomainError> {
    validate_window(window_size, window_count)?;

    let newest_first: Vec<&T> = runs.iter().rev().collect();
    let mut windows: Vec<(u32, f64)> = newest_first
        .chunks(window_size as usize)
        .take(window_count as usize)
        .zip((1..=window_count).rev())
        .map(|(chunk, label)| (label, calc_fliprate(chunk)))
        .collect();
    windows.sort_by_key(|(label, _)| *label);
    Ok(windows)
}

/// Fliprate table over calendar-day windows of `days` days each.
///
/// Only records within `days * window_count` days of the newest timestamp
/// are kept. Buckets start at midnight of the oldest kept record and are
/// keyed by their left edge.
pub fn calculate_n_days_fliprate_table(
    history: &TestHistory,
    days: u32,
    window_count: u32,
) -> Result<FliprateTable, DomainError> {
    validate_window(days, window_count)?;

    let Some(latest) = history.latest() else {
        return Ok(FliprateTable::new(Grouping::Days));
    };
    // A span too long for `Duration` reaches past any representable date.
    let cutoff = i64::from(days)
        .checked_mul(i64::from(window_count))
        .and_then(|total_days| total_days.checked_mul(SECONDS_PER_DAY))
        .and_then(|seconds| latest.checked_sub(Duration::seconds(seconds)))
        .unwrap_or(PrimitiveDateTime::MIN);

    let retained = history
        .records()
        .iter()
        .filter(|record| record.timestamp >= cutoff);

    let mut origin: Option<Date> = None;
    let mut cells: BTreeMap<(Date, &str), Vec<&TestStatus>> = BTreeMap::new();
    for record in retained {
        // Records are chronological, so the first one retained fixes the origin.
        let origin = *origin.get_or_insert(record.timestamp.date());
        let offset = (record.timestamp.date() - origin).whole_days();
        let bucket = offset / i64::from(days);
        let left_edge = origin + Duration::days(bucket * i64::from(days));
        cells
            .entry((left_edge, record.test_identifier.as_str()))
            .or_default()
            .push(&record.status);
    }

    let rows = cells
        .into_iter()
        .map(|((day, test_identifier), statuses)| {
            row(WindowKey::Day(day), test_identifier, calc_fliprate(&statuses))
        })
        .collect();

    Ok(FliprateTable {
        grouping: Grouping::Days,
        rows: finish_rows(rows),
    })
}

/// Fliprate table over the last `window_count` windows of `window_size`
/// runs, computed per test.
pub fn calculate_n_runs_fliprate_table(
    history: &TestHistory,
    window_size: u32,
    window_count: u32,
) -> Result<FliprateTable, DomainError> {
    validate_window(window_size, window_count)?;

    let mut rows = Vec::new();
    for (test_identifier, statuses) in history.by_test() {
        for (label, flip_rate) in non_overlapping_window_fliprate(&statuses, window_size, window_count)? {
            rows.push(row(WindowKey::Run(label), test_identifier, flip_rate));
        }
    }

    Ok(FliprateTable {
        grouping: Grouping::Runs,
        rows: finish_rows(rows),
    })
}

pub fn calculate_fliprate_table(
    history: &TestHistory,
    grouping: Grouping,
    window_size: u32,
    window_count: u32,
) -> Result<FliprateTable, DomainError> {
    match grouping {
        Grouping::Days => calculate_n_days_fliprate_table(history, window_size, window_count),
        Grouping::Runs => calculate_n_runs_fliprate_table(history, window_size, window_count),
    }
}
