use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::adapter::DeploymentVariant;
use crate::id_map::DuplicatePolicy;
use crate::multivalue::DEFAULT_DELIMITER;
use crate::submission::DEFAULT_MAX_VALUE_BYTES;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub parsing: ParsingConfig,
    #[serde(default)]
    pub id_map: IdMapConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapConfig {
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "default_locale")]
    pub default: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: default_locale(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub variant: DeploymentVariant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub engine: EngineConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// `.propbridge/config.toml` under `project_root`; `None` when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<Option<EngineConfig>> {
    let path = project_root.join(".propbridge/config.toml");
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Parse one engine config file.
///
/// # Errors
///
/// Fails when the file cannot be read or is not valid TOML for
/// [`EngineConfig`].
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EngineConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Path of the per-user config file, when the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("propbridge/config.toml"))
}

/// `<config_dir>/propbridge/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Project config wins over the user's `[engine]` table, which wins over
/// defaults. Output mode: `--json`, then `FORMAT`, then the user's
/// `output`, then TTY detection.
///
/// # Errors
///
/// Fails when either config file exists but is malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let engine = project
        .or_else(|| user.engine.clone())
        .unwrap_or_default();
    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    tracing::debug!(
        delimiter = %engine.parsing.delimiter,
        on_duplicate = %engine.id_map.on_duplicate,
        variant = %engine.deployment.variant,
        output = %resolved_output,
        "resolved config"
    );
    Ok(EffectiveConfig {
        engine,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<String>, env_format: Option<String>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

const fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

fn default_locale() -> String {
    "en".to_string()
}
