use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sparse::ZeroNormPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub zero_rows: ZeroNormPolicy,
}

/// How the score file is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One `<id>:<score>` line per item.
    #[default]
    Text,
    /// A JSON array of `{ "id", "score" }` objects.
    Json,
}

/// Load a run config.
///
/// `None` yields the defaults. An explicit path must exist and parse.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid run config
/// (bad TOML, unknown keys, or unknown enum values).
pub fn load_run_config(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_run_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse a run config from TOML text.
///
/// # Errors
///
/// Returns an error for malformed TOML or fields the config does not define.
pub fn parse_run_config(content: &str) -> Result<RunConfig> {
    Ok(toml::from_str::<RunConfig>(content)?)
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.txt")
}
