use flipgate_types::FliprateRow;
use std::collections::HashMap;

/// Smoothing factor for the fliprate moving average.
pub const EWM_ALPHA: f64 = 0.1;

fn ewm_step(previous: Option<f64>, value: f64, alpha: f64) -> f64 {
    match previous {
        None => value,
        Some(prev) => alpha * value + (1.0 - alpha) * prev,
    }
}

/// Exponentially weighted moving average without bias adjustment.
///
/// `y[0] = x[0]`, `y[i] = alpha * x[i] + (1 - alpha) * y[i - 1]`.
pub fn ewm_series(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut previous = None;
    for &value in values {
        let smoothed = ewm_step(previous, value, alpha);
        out.push(smoothed);
        previous = Some(smoothed);
    }
    out
}

/// Fill `flip_rate_ewm` for every row, smoothing each test independently in
/// the order its rows appear.
pub fn apply_ewm(rows: &mut [FliprateRow], alpha: f64) {
    let mut state: HashMap<String, f64> = HashMap::new();
    for row in rows.iter_mut() {
        let previous = state.get(&row.test_identifier).copied();
        let smoothed = ewm_step(previous, row.flip_rate, alpha);
        row.flip_rate_ewm = smoothed;
        state.insert(row.test_identifier.clone(), smoothed);
    }
}
