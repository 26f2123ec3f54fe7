//! JUnit and CSV sources describing the same runs must agree.

use flipgate_domain::{TestHistory, calculate_fliprate_table};
use flipgate_ingest::HistorySource;
use flipgate_types::Grouping;
use std::fs;
use tempfile::tempdir;

const RUNS: [(&str, &str, &str); 4] = [
    ("2021-07-01T07:00:00", "pass", "pass"),
    ("2021-07-01T08:00:00", "failure", "pass"),
    ("2021-07-02T07:00:00", "pass", "pass"),
    ("2021-07-03T07:00:00", "failure", "pass"),
];

#[test]
fn junit_and_csv_produce_the_same_table() {
    let dir = tempdir().expect("tempdir");
    let junit_dir = dir.path().join("junit");
    fs::create_dir(&junit_dir).expect("mkdir");

    let mut csv = String::from("timestamp,test_identifier,test_status\n");
    for (idx, &(ts, a, b)) in RUNS.iter().enumerate() {
        let case = |name: &str, status: &str| match status {
            "pass" => format!(r#"<testcase classname="pkg" name="{name}"/>"#),
            other => format!(r#"<testcase classname="pkg" name="{name}"><{other}/></testcase>"#),
        };
        let xml = format!(
            r#"<testsuite name="s" timestamp="{ts}">{}{}</testsuite>"#,
            case("a", a),
            case("b", b)
        );
        fs::write(junit_dir.join(format!("run-{idx}.xml")), xml).expect("write xml");

        csv.push_str(&format!("{ts},pkg::a,{a}\n{ts},pkg::b,{b}\n"));
    }
    let csv_path = dir.path().join("history.csv");
    fs::write(&csv_path, csv).expect("write csv");

    let from_junit = HistorySource::JunitDir(junit_dir).load().expect("junit");
    let from_csv = HistorySource::Csv(csv_path).load().expect("csv");
    assert_eq!(from_junit, from_csv);

    for grouping in [Grouping::Days, Grouping::Runs] {
        let junit_table =
            calculate_fliprate_table(&TestHistory::from_records(from_junit.clone()), grouping, 2, 2)
                .expect("table");
        let csv_table =
            calculate_fliprate_table(&TestHistory::from_records(from_csv.clone()), grouping, 2, 2)
                .expect("table");
        assert_eq!(junit_table, csv_table);
    }
}
