//! Locates and parses the reconciler configuration.

pub mod error;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use boxset_core::SyncConfig;

pub use error::ConfigLoadError;

pub const CONFIG_PATH_VAR: &str = "BOXSET_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "BOXSET_CONFIG_JSON";
pub const API_KEY_VAR: &str = "BOXSET_API_KEY";
pub const DEFAULT_CONFIG_FILE: &str = "boxset.toml";

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` on the command line.
    Flag(PathBuf),
    /// `$BOXSET_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// `$BOXSET_CONFIG_JSON`.
    EnvInline,
    /// `./boxset.toml` in the working directory.
    File(PathBuf),
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Flag(path) => {
                write!(f, "--config {}", path.display())
            }
            ConfigSource::EnvPath(path) => {
                write!(f, "{CONFIG_PATH_VAR}={}", path.display())
            }
            ConfigSource::EnvInline => write!(f, "{CONFIG_JSON_VAR}"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Default => write!(f, "built-in defaults"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SyncConfig,
    pub source: ConfigSource,
    /// `lookup.api_key` was taken from `$BOXSET_API_KEY`.
    pub api_key_from_env: bool,
}

/// Resolves configuration from, in order: an explicit path,
/// `$BOXSET_CONFIG_PATH` (TOML or JSON file), `$BOXSET_CONFIG_JSON` (inline
/// JSON), `./boxset.toml`, then defaults.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    vars: HashMap<String, String>,
    default_file: PathBuf,
}

impl ConfigLoader {
    /// Snapshot the `BOXSET_*` variables of the current process.
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars()
                .filter(|(key, _)| key.starts_with("BOXSET_"))
                .collect(),
            default_file: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    #[cfg(test)]
    fn with_var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn load(
        &self,
        explicit: Option<&Path>,
    ) -> Result<LoadedConfig, ConfigLoadError> {
        let (mut config, source) = self.locate(explicit)?;

        let api_key_from_env = match self.var(API_KEY_VAR) {
            Some(key) => {
                config.lookup.api_key = Some(key.trim().to_string());
                true
            }
            None => false,
        };

        config.validate()?;
        Ok(LoadedConfig {
            config,
            source,
            api_key_from_env,
        })
    }

    fn locate(
        &self,
        explicit: Option<&Path>,
    ) -> Result<(SyncConfig, ConfigSource), ConfigLoadError> {
        if let Some(path) = explicit {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::Flag(path.to_path_buf())));
        }

        if let Some(path) = self.var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path);
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = self.var(CONFIG_JSON_VAR) {
            let config = serde_json::from_str(raw).map_err(|source| {
                ConfigLoadError::Json {
                    origin: CONFIG_JSON_VAR.to_string(),
                    source,
                }
            })?;
            return Ok((config, ConfigSource::EnvInline));
        }

        if self.default_file.is_file() {
            let config = load_from_file(&self.default_file)?;
            return Ok((config, ConfigSource::File(self.default_file.clone())));
        }

        Ok((SyncConfig::default(), ConfigSource::Default))
    }
}

pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents).map_err(|source| {
            ConfigLoadError::Json {
                origin: path.display().to_string(),
                source,
            }
        }),
        Some("toml") | Some("tml") => {
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Toml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

/// Try TOML first, then JSON.
pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> Result<SyncConfig, ConfigLoadError> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            ConfigLoadError::Unparseable {
                origin: origin.to_string(),
                toml: toml_err.to_string(),
                json: json_err.to_string(),
            }
        })
    })
}
