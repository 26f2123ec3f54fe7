use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flipgate_app::{
    ExportFormat, ExportUseCase, FlipRateRequest, FlipRateUseCase, HeatmapUseCase, SystemClock,
    TableRequest, TableUseCase, render_console, render_markdown, render_markdown_template,
};
use flipgate_config::{
    ConfigFile, Overrides, discover_config, resolve_rank_settings, resolve_table_settings,
};
use flipgate_ingest::HistorySource;
use flipgate_types::{FlakeReport, Grouping, OutcomeRecord, ToolInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "flipgate",
    version,
    about = "Flaky test detection from test outcome fliprates"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Directory of JUnit XML reports
    #[arg(long)]
    junit_files: Option<PathBuf>,

    /// CSV with timestamp,test_identifier,test_status columns
    #[arg(long)]
    test_history_csv: Option<PathBuf>,
}

impl InputArgs {
    fn source(&self) -> anyhow::Result<HistorySource> {
        match (&self.junit_files, &self.test_history_csv) {
            (Some(dir), None) => Ok(HistorySource::JunitDir(dir.clone())),
            (None, Some(csv)) => Ok(HistorySource::Csv(csv.clone())),
            _ => anyhow::bail!("pass exactly one of --junit-files or --test-history-csv"),
        }
    }
}

#[derive(Debug, Args)]
struct WindowArgs {
    /// Window grouping: days or runs
    #[arg(long = "grouping-option")]
    grouping: Option<Grouping>,

    /// Days per window (days) or runs per window (runs)
    #[arg(long)]
    window_size: Option<u32>,

    /// Number of trailing windows to analyse
    #[arg(long)]
    window_count: Option<u32>,

    /// Config file (default: ./flipgate.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rank the flakiest tests by their latest window fliprate.
    Rank {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// How many tests to list
        #[arg(long)]
        top_n: Option<u32>,

        /// Significant digits of printed scores
        #[arg(short = 'p', long)]
        precision: Option<u32>,

        /// Write heatmap PNGs of the top tests
        #[arg(long, default_value_t = false)]
        heatmap: bool,

        /// Directory for heatmap PNGs
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Export the fliprate table as CSV or JSON Lines.
    Table {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// csv or jsonl
        #[arg(long, default_value = "csv", value_parser = parse_export_format)]
        format: ExportFormat,

        /// Output path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render a Markdown summary from a report.
    Md {
        #[arg(long)]
        report: PathBuf,

        /// Handlebars template rendered against the report JSON
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output markdown path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    if let Err(err) = real_main() {
        eprintln!("{err:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FLIPGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Rank {
            input,
            window,
            top_n,
            precision,
            heatmap,
            out_dir,
            report,
            pretty,
        } => {
            let config = load_config(&window)?;
            let overrides = Overrides {
                grouping: window.grouping,
                window_size: window.window_size,
                window_count: window.window_count,
                top_n,
                precision,
                out_dir,
            };
            let settings = resolve_rank_settings(&overrides, &config)?;
            let records = load_records(&input)?;

            let flake_report = FlipRateUseCase::new(SystemClock, tool_info()).execute(
                FlipRateRequest {
                    records,
                    params: settings.params,
                },
            )?;

            print!(
                "{}",
                render_console(&flake_report.top, flake_report.params.top_n)
            );

            if let Some(path) = report {
                write_json(&path, &flake_report, pretty)?;
                tracing::info!(path = %path.display(), "wrote report");
            }

            if heatmap {
                for artifact in HeatmapUseCase::execute(&flake_report)? {
                    let path = settings.out_dir.join(&artifact.file_name);
                    write_bytes(&path, &artifact.png)?;
                    tracing::info!(path = %path.display(), title = %artifact.title, "wrote heatmap");
                }
            }

            Ok(())
        }

        Command::Table {
            input,
            window,
            format,
            out,
        } => {
            let config = load_config(&window)?;
            let overrides = Overrides {
                grouping: window.grouping,
                window_size: window.window_size,
                window_count: window.window_count,
                ..Overrides::default()
            };
            let settings = resolve_table_settings(&overrides, &config)?;
            let records = load_records(&input)?;

            let table = TableUseCase::execute(TableRequest {
                records,
                grouping: settings.grouping,
                window_size: settings.window_size,
                window_count: settings.window_count,
            })?;
            let exported = ExportUseCase::export_table(&table, format)?;

            match out {
                Some(path) => {
                    write_bytes(&path, exported.as_bytes())?;
                    tracing::info!(path = %path.display(), rows = table.len(), "wrote table");
                }
                None => print!("{exported}"),
            }

            Ok(())
        }

        Command::Md {
            report,
            template,
            out,
        } => {
            let flake_report: FlakeReport = read_json(&report)?;
            let md = match template {
                Some(path) => {
                    let template = fs::read_to_string(&path)
                        .with_context(|| format!("read {}", path.display()))?;
                    render_markdown_template(&flake_report, &template)
                        .with_context(|| format!("render template {}", path.display()))?
                }
                None => render_markdown(&flake_report),
            };

            match out {
                Some(path) => {
                    write_bytes(&path, md.as_bytes())?;
                }
                None => {
                    print!("{md}");
                }
            }

            Ok(())
        }
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "flipgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn parse_export_format(s: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(s).ok_or_else(|| format!("invalid format: {s} (expected csv|jsonl)"))
}

fn load_config(window: &WindowArgs) -> anyhow::Result<ConfigFile> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    discover_config(window.config.as_deref(), &cwd)
}

fn load_records(input: &InputArgs) -> anyhow::Result<Vec<OutcomeRecord>> {
    let source = input.source()?;
    let records = source
        .load()
        .with_context(|| format!("load test history from {}", source.path().display()))?;
    tracing::debug!(records = records.len(), "loaded test history");
    Ok(records)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    write_bytes(path, &bytes)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    atomic_write(path, bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
