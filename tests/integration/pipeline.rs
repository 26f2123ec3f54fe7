use approx::assert_relative_eq;
use flipgate_app::{
    Clock, ExportFormat, ExportUseCase, FlipRateRequest, FlipRateUseCase, HeatmapUseCase,
};
use flipgate_ingest::parse_history_csv;
use flipgate_types::{Grouping, ToolInfo, WindowKey, WindowParams};
use time::macros::date;

struct FixedClock;

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        "2021-07-10T00:00:00Z".to_string()
    }
}

fn tool() -> ToolInfo {
    ToolInfo {
        name: "flipgate".into(),
        version: "0.0.0".into(),
    }
}

/// A week of nightly runs. `flaky` alternates, `broken` fails from day 4 on,
/// `stable` always passes, `retired` is skipped every night.
fn week_csv() -> String {
    let mut csv = String::from("timestamp,test_identifier,test_status\n");
    for day in 1..=7 {
        let ts = format!("2021-07-0{day} 02:00:00");
        let flaky = if day % 2 == 0 { "fail" } else { "pass" };
        let broken = if day >= 4 { "fail" } else { "pass" };
        csv.push_str(&format!("{ts},flaky,{flaky}\n"));
        csv.push_str(&format!("{ts},broken,{broken}\n"));
        csv.push_str(&format!("{ts},stable,pass\n"));
        csv.push_str(&format!("{ts},retired,skipped\n"));
    }
    csv
}

fn params(grouping: Grouping, window_size: u32, window_count: u32) -> WindowParams {
    WindowParams {
        grouping,
        window_size,
        window_count,
        top_n: 3,
        precision: 3,
    }
}

#[test]
fn csv_to_ranked_report_by_days() {
    let records = parse_history_csv(&week_csv()).expect("csv");
    assert_eq!(records.len(), 28);

    let report = FlipRateUseCase::new(FixedClock, tool())
        .execute(FlipRateRequest {
            records,
            params: params(Grouping::Days, 2, 3),
        })
        .expect("report");

    assert_eq!(report.summary.record_count, 21);
    assert_eq!(report.summary.test_count, 3);
    assert!(report.table.rows.iter().all(|r| r.test_identifier != "stable"));

    // The cutoff is inclusive, so all seven days are kept and the buckets
    // start at 07-01. The single-day bucket at 07-07 never flips.
    assert_eq!(
        report.table.windows(),
        vec![
            WindowKey::Day(date!(2021 - 07 - 01)),
            WindowKey::Day(date!(2021 - 07 - 03)),
            WindowKey::Day(date!(2021 - 07 - 05)),
        ]
    );

    let normal: Vec<_> = report
        .top
        .top_normal_scores
        .iter()
        .map(|e| (e.test_identifier.as_str(), e.score.normalize().to_string()))
        .collect();
    assert_eq!(normal.len(), 2);
    assert!(normal.contains(&("flaky", "1".to_string())));
    assert!(normal.contains(&("broken", "1".to_string())));

    // broken only flipped once, long ago, so smoothing ranks it well below flaky.
    let ewm: Vec<_> = report
        .top
        .top_ewm_scores
        .iter()
        .map(|e| (e.test_identifier.as_str(), e.score.normalize().to_string()))
        .collect();
    assert_eq!(
        ewm,
        vec![("flaky", "1".to_string()), ("broken", "0.1".to_string())]
    );
}

#[test]
fn csv_to_ranked_report_by_runs() {
    let records = parse_history_csv(&week_csv()).expect("csv");
    let report = FlipRateUseCase::new(FixedClock, tool())
        .execute(FlipRateRequest {
            records,
            params: params(Grouping::Runs, 3, 2),
        })
        .expect("report");

    // broken, newest first: F F F | F P P, so only the older window flips.
    let broken: Vec<_> = report
        .table
        .rows
        .iter()
        .filter(|r| r.test_identifier == "broken")
        .collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].window, WindowKey::Run(1));
    assert_relative_eq!(broken[0].flip_rate, 0.5);

    let flaky: Vec<_> = report
        .table
        .rows
        .iter()
        .filter(|r| r.test_identifier == "flaky")
        .collect();
    assert_eq!(flaky.len(), 2);
    assert_relative_eq!(flaky[0].flip_rate, 1.0);
    assert_relative_eq!(flaky[1].flip_rate_ewm, 1.0);
}

#[test]
fn report_feeds_export_and_heatmaps() {
    let records = parse_history_csv(&week_csv()).expect("csv");
    let report = FlipRateUseCase::new(FixedClock, tool())
        .execute(FlipRateRequest {
            records,
            params: params(Grouping::Days, 1, 7),
        })
        .expect("report");

    let csv = ExportUseCase::export_table(&report.table, ExportFormat::Csv).expect("export");
    assert_eq!(csv.lines().count(), report.table.len() + 1);

    let artifacts = HeatmapUseCase::execute(&report).expect("heatmaps");
    let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["1day_flip_rate_top3.png", "1day_flip_rate_ewm_top3.png"]
    );
    assert!(artifacts.iter().all(|a| a.png.starts_with(b"\x89PNG")));
}

#[test]
fn json_report_round_trips() {
    let records = parse_history_csv(&week_csv()).expect("csv");
    let report = FlipRateUseCase::new(FixedClock, tool())
        .execute(FlipRateRequest {
            records,
            params: params(Grouping::Days, 2, 3),
        })
        .expect("report");

    let json = serde_json::to_string(&report).expect("serialize");
    let back: flipgate_types::FlakeReport = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, report);
}
