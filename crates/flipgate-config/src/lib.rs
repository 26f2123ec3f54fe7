//! Configuration loading and merging for flipgate.
//!
//! Precedence: CLI flag, then `[defaults]` in `flipgate.toml`, then the
//! built-in default. Only `precision` and `out_dir` have built-in defaults.

use anyhow::Context;
use flipgate_types::{DEFAULT_PRECISION, Grouping, WindowParams};
use std::path::{Path, PathBuf};

pub use flipgate_types::ConfigFile;

pub const DEFAULT_CONFIG_FILE: &str = "flipgate.toml";

pub const DEFAULT_OUT_DIR: &str = ".";

/// Settings given on the command line. `None` means "not passed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub grouping: Option<Grouping>,
    pub window_size: Option<u32>,
    pub window_count: Option<u32>,
    pub top_n: Option<u32>,
    pub precision: Option<u32>,
    pub out_dir: Option<PathBuf>,
}

/// Windowing settings needed to build a fliprate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSettings {
    pub grouping: Grouping,
    pub window_size: u32,
    pub window_count: u32,
}

/// Everything a ranking run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSettings {
    pub params: WindowParams,
    pub out_dir: PathBuf,
}

pub fn parse_config(content: &str) -> anyhow::Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    Ok(config)
}

pub fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parse config {}", path.display()))
}

/// Load the config named on the command line, or `flipgate.toml` in `cwd`
/// when present. An explicit path that does not exist is an error.
pub fn discover_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<ConfigFile> {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "loading config");
        return load_config_file(path);
    }
    let implicit = cwd.join(DEFAULT_CONFIG_FILE);
    if implicit.is_file() {
        tracing::debug!(path = %implicit.display(), "loading config");
        return load_config_file(&implicit);
    }
    Ok(ConfigFile::default())
}

#[derive(Default)]
struct Missing(Vec<&'static str>);

impl Missing {
    fn take<T>(&mut self, name: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.0.push(name);
        }
        value
    }

    fn check(self) -> anyhow::Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        anyhow::bail!(
            "missing required setting(s): {} (pass them as flags or set them under [defaults] in {DEFAULT_CONFIG_FILE})",
            self.0.join(", ")
        )
    }
}

pub fn resolve_table_settings(
    overrides: &Overrides,
    config: &ConfigFile,
) -> anyhow::Result<TableSettings> {
    let defaults = &config.defaults;
    let mut missing = Missing::default();

    let grouping = missing.take("grouping", overrides.grouping.or(defaults.grouping));
    let window_size = missing.take("window_size", overrides.window_size.or(defaults.window_size));
    let window_count = missing.take(
        "window_count",
        overrides.window_count.or(defaults.window_count),
    );

    missing.check()?;

    let (Some(grouping), Some(window_size), Some(window_count)) =
        (grouping, window_size, window_count)
    else {
        anyhow::bail!("incomplete window settings");
    };
    Ok(TableSettings {
        grouping,
        window_size,
        window_count,
    })
}

pub fn resolve_rank_settings(
    overrides: &Overrides,
    config: &ConfigFile,
) -> anyhow::Result<RankSettings> {
    let defaults = &config.defaults;
    let mut missing = Missing::default();

    let grouping = missing.take("grouping", overrides.grouping.or(defaults.grouping));
    let window_size = missing.take("window_size", overrides.window_size.or(defaults.window_size));
    let window_count = missing.take(
        "window_count",
        overrides.window_count.or(defaults.window_count),
    );
    let top_n = missing.take("top_n", overrides.top_n.or(defaults.top_n));
    missing.check()?;

    let (Some(grouping), Some(window_size), Some(window_count), Some(top_n)) =
        (grouping, window_size, window_count, top_n)
    else {
        anyhow::bail!("incomplete ranking settings");
    };

    let precision = overrides
        .precision
        .or(defaults.precision)
        .unwrap_or(DEFAULT_PRECISION);
    let out_dir = overrides
        .out_dir
        .clone()
        .or_else(|| defaults.out_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));

    Ok(RankSettings {
        params: WindowParams {
            grouping,
            window_size,
            window_count,
            top_n,
            precision,
        },
        out_dir,
    })
}
