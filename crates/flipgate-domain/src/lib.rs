//! Domain logic for flipgate.
//!
//! This crate is intentionally I/O-free: it does math and policy.
//!
//! Pipeline: [`TestHistory`] → windowing ([`calculate_n_days_fliprate_table`] or
//! [`calculate_n_runs_fliprate_table`]) → [`calc_fliprate`] per window →
//! [`apply_ewm`] per test → [`get_top_fliprates`].

mod ewm;
mod fliprate;
mod heatmap;
mod history;
mod ranking;
mod windows;

pub use ewm::{EWM_ALPHA, apply_ewm, ewm_series};
pub use fliprate::calc_fliprate;
pub use heatmap::{HeatmapMatrix, HeatmapRow, HeatmapTables, get_image_tables_from_fliprate_table};
pub use history::TestHistory;
pub use ranking::{MAX_PRECISION, get_top_fliprates, latest_windows, round_score};
pub use windows::{
    calculate_fliprate_table, calculate_n_days_fliprate_table, calculate_n_runs_fliprate_table,
    non_overlapping_window_fliprate,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("window size must be > 0")]
    InvalidWindowSize,

    #[error("window count must be > 0")]
    InvalidWindowCount,

    #[error("precision must be between 1 and {max} significant digits, got {0}", max = MAX_PRECISION)]
    InvalidPrecision(u32),

    #[error("score {0} cannot be represented as a decimal")]
    UnrepresentableScore(f64),
}
