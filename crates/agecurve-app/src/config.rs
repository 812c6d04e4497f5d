// Configuration loading and parsing (config/analysis.toml).

use agecurve_core::{ByPosition, FilterParams, Position};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataPaths,
    pub output: OutputConfig,
    pub significance_level: f64,
    /// Per-position filters, with unspecified positions already defaulted.
    pub filters: ByPosition<FilterParams>,
}

/// Input and output directories. Relative paths are resolved against the
/// directory the config was loaded from.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Whether artifacts are written to `processed_dir`.
    pub download: bool,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

fn default_summary_file() -> String {
    "run_summary.json".into()
}

// ---------------------------------------------------------------------------
// analysis.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire analysis.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AnalysisFile {
    data: DataPaths,
    output: OutputConfig,
    report: ReportSection,
    #[serde(default)]
    filters: FiltersSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ReportSection {
    significance_level: f64,
}

/// Per-position overrides keyed by position code ("QB", "RB", ...).
#[derive(Debug, Clone, Default, Deserialize)]
struct FiltersSection {
    #[serde(default)]
    min_years: BTreeMap<String, i64>,
    #[serde(default)]
    fp_cutoff: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/analysis.toml` relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("analysis.toml");
    let text = read_file(&path)?;
    let file: AnalysisFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let filters = resolve_filters(&file.filters)?;

    let config = Config {
        data: DataPaths {
            raw_dir: base_dir.join(file.data.raw_dir),
            processed_dir: base_dir.join(file.data.processed_dir),
        },
        output: file.output,
        significance_level: file.report.significance_level,
        filters,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Turn the per-position override maps into one `FilterParams` per position.
/// Missing positions default to 0 seasons and a 0-point cutoff.
fn resolve_filters(section: &FiltersSection) -> Result<ByPosition<FilterParams>, ConfigError> {
    let min_years = keyed_by_position("min_years", &section.min_years)?;
    let fp_cutoff = keyed_by_position("fp_cutoff", &section.fp_cutoff)?;

    ByPosition::try_from_fn(|pos| {
        let years = min_years.get(&pos).copied().unwrap_or(0);
        let cutoff = fp_cutoff.get(&pos).copied().unwrap_or(0.0);
        FilterParams::new(years, cutoff).map_err(|e| ConfigError::ValidationError {
            field: format!("filters.{}", pos.code()),
            message: e.to_string(),
        })
    })
}

/// Re-key an override map by position. Codes are case-insensitive, so "QB"
/// and "qb" in the same table are a conflict.
fn keyed_by_position<T: Copy>(
    table: &str,
    raw: &BTreeMap<String, T>,
) -> Result<BTreeMap<Position, T>, ConfigError> {
    let mut keyed = BTreeMap::new();
    for (code, &value) in raw {
        let Some(pos) = Position::from_code(code) else {
            return Err(ConfigError::ValidationError {
                field: format!("filters.{table}.{code}"),
                message: "unknown position (expected QB, RB, WR or TE)".into(),
            });
        };
        if keyed.insert(pos, value).is_some() {
            return Err(ConfigError::ValidationError {
                field: format!("filters.{table}.{code}"),
                message: format!("{} is set more than once", pos.code()),
            });
        }
    }
    Ok(keyed)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let alpha = config.significance_level;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ConfigError::ValidationError {
            field: "report.significance_level".into(),
            message: format!("must be strictly between 0.0 and 1.0, got {alpha}"),
        });
    }

    if config.output.summary_file.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "output.summary_file".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
