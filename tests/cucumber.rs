//! BDD test runner using cucumber for the flipgate CLI.
//!
//! Feature files live in `features/`. Step definitions cover:
//! - Given steps: test history fixtures (CSV rows, JUnit reports, config)
//! - When steps: CLI command execution
//! - Then steps: exit code, stdout and artifact assertions

use assert_cmd::Command;
use cucumber::{World, gherkin::Step, given, then, when};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use flipgate_types::{FlakeReport, REPORT_SCHEMA_V1};

/// World struct that holds state across BDD scenario steps.
#[derive(Debug, Default, World)]
pub struct FlipgateWorld {
    /// Temporary directory for test artifacts, also the working directory
    temp_dir: Option<TempDir>,
    /// Input flag and path handed to the CLI
    input: Option<(String, PathBuf)>,
    /// Path the last command wrote its report to
    report_path: Option<PathBuf>,
    /// Exit code from last command execution
    last_exit_code: Option<i32>,
    /// Stdout from last command execution
    last_stdout: String,
    /// Stderr from last command execution
    last_stderr: String,
    /// Additional CLI arguments to pass
    extra_args: Vec<String>,
}

impl FlipgateWorld {
    /// Get or create the temporary directory for this scenario
    pub fn ensure_temp_dir(&mut self) {
        if self.temp_dir.is_none() {
            self.temp_dir = Some(TempDir::new().expect("Failed to create temp directory"));
        }
    }

    /// Get the path to the temporary directory
    pub fn temp_path(&self) -> PathBuf {
        self.temp_dir
            .as_ref()
            .expect("Temp dir not initialized")
            .path()
            .to_path_buf()
    }

    fn record_output(&mut self, output: std::process::Output) {
        self.last_exit_code = Some(output.status.code().unwrap_or(-1));
        self.last_stdout = String::from_utf8_lossy(&output.stdout).to_string();
        self.last_stderr = String::from_utf8_lossy(&output.stderr).to_string();
    }

    fn run_cli(&mut self, args: &[String]) {
        self.ensure_temp_dir();
        let mut cmd = flipgate_cmd();
        cmd.current_dir(self.temp_path()).args(args);
        if let Some((flag, path)) = &self.input {
            cmd.arg(flag).arg(path);
        }
        cmd.args(&self.extra_args);
        let output = cmd.output().expect("Failed to execute flipgate");
        self.record_output(output);
    }
}

fn flipgate_cmd() -> Command {
    Command::cargo_bin("flipgate").expect("Failed to find flipgate binary")
}

/// Data table rows without the header, one `Vec<String>` per row.
fn table_rows(step: &Step) -> Vec<Vec<String>> {
    step.table
        .as_ref()
        .expect("step needs a data table")
        .rows
        .iter()
        .skip(1)
        .cloned()
        .collect()
}

// ============================================================================
// GIVEN STEPS - Fixtures
// ============================================================================

#[given("a temporary directory for test artifacts")]
async fn given_temp_directory(world: &mut FlipgateWorld) {
    world.ensure_temp_dir();
}

/// Table columns: timestamp, test_identifier, test_status
#[given("a test history CSV with rows:")]
async fn given_history_csv(world: &mut FlipgateWorld, step: &Step) {
    world.ensure_temp_dir();
    let mut csv = String::from("timestamp,test_identifier,test_status\n");
    for row in table_rows(step) {
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    let path = world.temp_path().join("history.csv");
    fs::write(&path, csv).expect("Failed to write history CSV");
    world.input = Some(("--test-history-csv".to_string(), path));
}

/// Table columns: timestamp, classname, name, result. One report per row
/// group sharing a timestamp.
#[given("a directory of JUnit reports with cases:")]
async fn given_junit_dir(world: &mut FlipgateWorld, step: &Step) {
    world.ensure_temp_dir();
    let dir = world.temp_path().join("junit");
    fs::create_dir_all(&dir).expect("Failed to create JUnit dir");

    let mut suites: Vec<(String, String)> = Vec::new();
    for row in table_rows(step) {
        let [timestamp, classname, name, result] = <[String; 4]>::try_from(row)
            .expect("JUnit rows need timestamp, classname, name, result");
        let body = match result.as_str() {
            "pass" => String::new(),
            other => format!("<{other}/>"),
        };
        let case = format!(r#"<testcase classname="{classname}" name="{name}">{body}</testcase>"#);
        match suites.iter_mut().find(|(ts, _)| *ts == timestamp) {
            Some((_, cases)) => cases.push_str(&case),
            None => suites.push((timestamp, case)),
        }
    }

    for (idx, (timestamp, cases)) in suites.iter().enumerate() {
        let xml = format!(
            r#"<testsuites><testsuite name="suite" timestamp="{timestamp}">{cases}</testsuite></testsuites>"#
        );
        fs::write(dir.join(format!("report-{idx:03}.xml")), xml)
            .expect("Failed to write JUnit report");
    }
    world.input = Some(("--junit-files".to_string(), dir));
}

#[given(expr = "a config file with grouping {word}, window size {int}, window count {int} and top {int}")]
async fn given_config_file(
    world: &mut FlipgateWorld,
    grouping: String,
    window_size: u32,
    window_count: u32,
    top_n: u32,
) {
    world.ensure_temp_dir();
    let toml = format!(
        "[defaults]\ngrouping = \"{grouping}\"\nwindow_size = {window_size}\nwindow_count = {window_count}\ntop_n = {top_n}\n"
    );
    fs::write(world.temp_path().join("flipgate.toml"), toml).expect("Failed to write config");
}

#[given("the --heatmap flag is set")]
async fn given_heatmap_flag(world: &mut FlipgateWorld) {
    world.extra_args.push("--heatmap".to_string());
}

#[given(expr = "the precision is {int}")]
async fn given_precision(world: &mut FlipgateWorld, precision: u32) {
    world.extra_args.push("--precision".to_string());
    world.extra_args.push(precision.to_string());
}

// ============================================================================
// WHEN STEPS - Command Execution
// ============================================================================

#[when(
    expr = "I run flipgate rank grouped by {word} with window size {int}, window count {int} and top {int}"
)]
async fn when_rank(
    world: &mut FlipgateWorld,
    grouping: String,
    window_size: u32,
    window_count: u32,
    top_n: u32,
) {
    world.ensure_temp_dir();
    let report_path = world.temp_path().join("report.json");
    let args = vec![
        "rank".to_string(),
        "--grouping-option".to_string(),
        grouping,
        "--window-size".to_string(),
        window_size.to_string(),
        "--window-count".to_string(),
        window_count.to_string(),
        "--top-n".to_string(),
        top_n.to_string(),
        "--report".to_string(),
        report_path.display().to_string(),
    ];
    world.run_cli(&args);
    world.report_path = Some(report_path);
}

#[when("I run flipgate rank with config defaults")]
async fn when_rank_with_config(world: &mut FlipgateWorld) {
    world.run_cli(&["rank".to_string()]);
}

#[when(
    expr = "I run flipgate table grouped by {word} with window size {int} and window count {int}"
)]
async fn when_table(
    world: &mut FlipgateWorld,
    grouping: String,
    window_size: u32,
    window_count: u32,
) {
    let args = vec![
        "table".to_string(),
        "--grouping-option".to_string(),
        grouping,
        "--window-size".to_string(),
        window_size.to_string(),
        "--window-count".to_string(),
        window_count.to_string(),
    ];
    world.run_cli(&args);
}

#[when("I run flipgate md on the report")]
async fn when_md(world: &mut FlipgateWorld) {
    let report = world.report_path.clone().expect("Report path not set");
    world.input = None;
    world.extra_args.clear();
    world.run_cli(&[
        "md".to_string(),
        "--report".to_string(),
        report.display().to_string(),
    ]);
}

// ============================================================================
// THEN STEPS - Assertions
// ============================================================================

/// Assert the exit code matches expected value
#[then(expr = "the exit code should be {int}")]
async fn then_exit_code(world: &mut FlipgateWorld, expected: i32) {
    let actual = world.last_exit_code.expect("No exit code recorded");
    assert_eq!(
        actual, expected,
        "Expected exit code {}, got {}. Stderr: {}",
        expected, actual, world.last_stderr
    );
}

#[then(expr = "stdout should contain {string}")]
async fn then_stdout_contains(world: &mut FlipgateWorld, expected: String) {
    assert!(
        world.last_stdout.contains(&expected),
        "Expected stdout to contain '{}', got:\n{}",
        expected,
        world.last_stdout
    );
}

#[then(expr = "stdout should contain the line {string}")]
async fn then_stdout_contains_line(world: &mut FlipgateWorld, expected: String) {
    assert!(
        world.last_stdout.lines().any(|line| line == expected),
        "Expected stdout to contain the line '{}', got:\n{}",
        expected,
        world.last_stdout
    );
}

#[then(expr = "stdout should not contain {string}")]
async fn then_stdout_not_contains(world: &mut FlipgateWorld, unexpected: String) {
    assert!(
        !world.last_stdout.contains(&unexpected),
        "Expected stdout not to contain '{}', got:\n{}",
        unexpected,
        world.last_stdout
    );
}

#[then(expr = "stderr should contain {string}")]
async fn then_stderr_contains(world: &mut FlipgateWorld, expected: String) {
    assert!(
        world.last_stderr.contains(&expected),
        "Expected stderr to contain '{}', got:\n{}",
        expected,
        world.last_stderr
    );
}

#[then(expr = "the file {string} should exist")]
async fn then_file_exists(world: &mut FlipgateWorld, name: String) {
    let path = world.temp_path().join(&name);
    assert!(path.is_file(), "Expected {} to exist", path.display());
}

#[then(expr = "the report should rank {string} first with score {string}")]
async fn then_report_ranks_first(world: &mut FlipgateWorld, test: String, score: String) {
    let path = world.report_path.as_ref().expect("No report path set");
    let content = fs::read_to_string(path).expect("Failed to read report");
    let report: FlakeReport = serde_json::from_str(&content).expect("Failed to parse report");

    assert_eq!(report.schema, REPORT_SCHEMA_V1);
    let first = report
        .top
        .top_normal_scores
        .first()
        .expect("Expected at least one ranked test");
    assert_eq!(first.test_identifier, test);
    assert_eq!(first.score.normalize().to_string(), score);
}

// ============================================================================
// MAIN FUNCTION
// ============================================================================

#[tokio::main]
async fn main() {
    <FlipgateWorld as World>::run("features/").await;
}
