use crate::DomainError;
use flipgate_types::{FliprateRow, FliprateTable, ScoreEntry, TopFliprates};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Largest number of significant digits a score can be rounded to.
pub const MAX_PRECISION: u32 = 28;

fn validate_precision(precision: u32) -> Result<(), DomainError> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(DomainError::InvalidPrecision(precision));
    }
    Ok(())
}

fn significant_digits(value: Decimal) -> u32 {
    let mut mantissa = value.mantissa().unsigned_abs();
    let mut digits = 1;
    while mantissa >= 10 {
        mantissa /= 10;
        digits += 1;
    }
    digits
}

/// Round `value` to `precision` significant digits, ties away from zero.
///
/// A value that already fits in `precision` digits is returned as is, so
/// `0.5` stays `0.5` rather than gaining trailing zeros.
pub fn round_score(value: f64, precision: u32) -> Result<Decimal, DomainError> {
    validate_precision(precision)?;
    let exact = Decimal::from_f64_retain(value)
        .ok_or(DomainError::UnrepresentableScore(value))?
        .normalize();
    if significant_digits(exact) <= precision {
        return Ok(exact);
    }
    exact
        .round_sf_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
        .ok_or(DomainError::UnrepresentableScore(value))
}

/// Last row of every test in table order, i.e. its most recent window.
pub fn latest_windows(table: &FliprateTable) -> BTreeMap<&str, &FliprateRow> {
    let mut latest = BTreeMap::new();
    for row in &table.rows {
        latest.insert(row.test_identifier.as_str(), row);
    }
    latest
}

fn top_by(
    latest: &BTreeMap<&str, &FliprateRow>,
    top_n: u32,
    precision: u32,
    score: impl Fn(&FliprateRow) -> f64,
) -> Result<Vec<ScoreEntry>, DomainError> {
    let mut candidates: Vec<(&str, f64)> = latest
        .iter()
        .map(|(test_identifier, row)| (*test_identifier, score(row)))
        .collect();
    // Stable: equal scores keep ascending identifier order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    candidates
        .into_iter()
        .take(top_n as usize)
        .map(|(test_identifier, value)| {
            Ok(ScoreEntry {
                test_identifier: test_identifier.to_string(),
                score: round_score(value, precision)?,
            })
        })
        .collect()
}

/// Rank tests by the fliprate of their latest window, both raw and smoothed.
pub fn get_top_fliprates(
    table: &FliprateTable,
    top_n: u32,
    precision: u32,
) -> Result<TopFliprates, DomainError> {
    validate_precision(precision)?;
    let latest = latest_windows(table);
    Ok(TopFliprates {
        top_normal_scores: top_by(&latest, top_n, precision, |row| row.flip_rate)?,
        top_ewm_scores: top_by(&latest, top_n, precision, |row| row.flip_rate_ewm)?,
    })
}
