use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

/// Crates holding the fliprate arithmetic and the parsers feeding it.
const MUTATED_CRATES: [&str; 2] = ["flipgate-domain", "flipgate-ingest"];

/// Where `ci` regenerates schemas so the tree stays clean.
const CI_SCHEMA_DIR: &str = "target/schemas";

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for flipgate")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write JSON Schemas for the rank report and `flipgate.toml`.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail instead of writing when a schema on disk is missing or stale.
        #[arg(long)]
        check: bool,
    },

    /// Lint, unit tests, CLI tests, feature files, schemas and fuzz targets.
    Ci {
        /// Skip building the cargo-fuzz harnesses.
        #[arg(long)]
        skip_fuzz: bool,
    },

    /// Mutation-test the windowing, ranking and parsing crates.
    Mutants {
        /// Crate to mutate; repeat to pick several.
        #[arg(long = "crate", default_values_t = MUTATED_CRATES.map(String::from))]
        crates: Vec<String>,

        /// Extra args forwarded to cargo-mutants
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

struct CiStep {
    name: &'static str,
    cargo_args: &'static [&'static str],
}

const CI_STEPS: &[CiStep] = &[
    CiStep {
        name: "fmt",
        cargo_args: &["fmt", "--all", "--", "--check"],
    },
    CiStep {
        name: "clippy",
        cargo_args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    },
    CiStep {
        name: "unit tests",
        cargo_args: &["test", "--workspace", "--lib", "--bins"],
    },
    CiStep {
        name: "cli tests",
        cargo_args: &["test", "-p", "flipgate-cli", "--tests"],
    },
    CiStep {
        name: "pipeline tests",
        cargo_args: &["test", "-p", "flipgate-tests", "--test", "integration"],
    },
    CiStep {
        name: "feature files",
        cargo_args: &["test", "-p", "flipgate-tests", "--test", "cucumber"],
    },
];

const FUZZ_STEP: CiStep = CiStep {
    name: "fuzz targets",
    cargo_args: &["check", "--manifest-path", "fuzz/Cargo.toml", "--bins"],
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Ci { skip_fuzz } => cmd_ci(skip_fuzz),
        Command::Mutants { crates, args } => cmd_mutants(&crates, &args),
    }
}

fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let status = Process::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("running cargo {}", args.join(" ")))?;
    if !status.success() {
        anyhow::bail!("cargo {} failed: {status}", args.join(" "));
    }
    Ok(())
}

fn cmd_ci(skip_fuzz: bool) -> anyhow::Result<()> {
    for step in CI_STEPS {
        eprintln!("==> {}", step.name);
        cargo(step.cargo_args)?;
    }

    eprintln!("==> schemas");
    cmd_schema(Path::new(CI_SCHEMA_DIR), false)?;

    if skip_fuzz {
        eprintln!("==> {} (skipped)", FUZZ_STEP.name);
    } else {
        eprintln!("==> {}", FUZZ_STEP.name);
        cargo(FUZZ_STEP.cargo_args)?;
    }
    Ok(())
}

fn cmd_mutants(crates: &[String], args: &[String]) -> anyhow::Result<()> {
    let mut failed = Vec::new();
    for name in crates {
        eprintln!("==> mutants: {name}");
        let mut cargo_args = vec!["mutants", "-p", name.as_str()];
        cargo_args.extend(args.iter().map(String::as_str));
        if let Err(err) = cargo(&cargo_args) {
            eprintln!("{err:#}");
            failed.push(name.as_str());
        }
    }
    if !failed.is_empty() {
        anyhow::bail!("surviving mutants or errors in: {}", failed.join(", "));
    }
    Ok(())
}

/// File name and pretty JSON for every published schema.
fn schemas() -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let mut out = Vec::new();
    for (name, schema) in [
        (
            format!("{}.schema.json", flipgate_types::REPORT_SCHEMA_V1),
            schema_for!(flipgate_types::FlakeReport),
        ),
        (
            "flipgate.config.v1.schema.json".to_string(),
            schema_for!(flipgate_types::ConfigFile),
        ),
    ] {
        let mut json = serde_json::to_vec_pretty(&schema)?;
        json.push(b'\n');
        out.push((name, json));
    }
    Ok(out)
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    let schemas = schemas()?;

    if check {
        let stale: Vec<&str> = schemas
            .iter()
            .filter(|(name, json)| fs::read(out_dir.join(name)).ok().as_ref() != Some(json))
            .map(|(name, _)| name.as_str())
            .collect();
        if !stale.is_empty() {
            anyhow::bail!(
                "schemas out of date in {}: {} (run `cargo xtask schema`)",
                out_dir.display(),
                stale.join(", ")
            );
        }
        return Ok(());
    }

    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;
    for (name, json) in &schemas {
        let path = out_dir.join(name);
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
