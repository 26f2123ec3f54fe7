#![no_main]

use arbitrary::Arbitrary;
use flipgate_domain::{TestHistory, calculate_fliprate_table, get_top_fliprates};
use flipgate_types::{Grouping, OutcomeRecord, TestStatus};
use libfuzzer_sys::fuzz_target;
use time::{Duration, macros::datetime};

#[derive(Debug, Arbitrary)]
struct Outcome {
    minutes: u16,
    test: u8,
    status: TestStatus,
}

#[derive(Debug, Arbitrary)]
struct Input {
    by_runs: bool,
    window_size: u8,
    window_count: u8,
    top_n: u8,
    precision: u8,
    outcomes: Vec<Outcome>,
}

fuzz_target!(|input: Input| {
    let start = datetime!(2021-01-01 00:00);
    let records = input
        .outcomes
        .iter()
        .map(|o| {
            OutcomeRecord::new(
                start + Duration::minutes(i64::from(o.minutes) * 30),
                format!("t{}", o.test % 8),
                o.status.clone(),
            )
        })
        .collect();
    let history = TestHistory::from_records(records);
    let grouping = if input.by_runs {
        Grouping::Runs
    } else {
        Grouping::Days
    };

    let Ok(table) = calculate_fliprate_table(
        &history,
        grouping,
        u32::from(input.window_size),
        u32::from(input.window_count),
    ) else {
        return;
    };
    for row in &table.rows {
        assert!(row.flip_rate > 0.0 && row.flip_rate <= 1.0);
        assert!(row.flip_rate_ewm >= 0.0 && row.flip_rate_ewm <= 1.0 + 1e-12);
    }
    let _ = get_top_fliprates(&table, u32::from(input.top_n), u32::from(input.precision));
});
