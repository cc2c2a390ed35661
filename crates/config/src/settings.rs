// Run settings
// Loaded from --config, else ~/.config/mandates/config.toml when present

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;

/// How CRM candidates are looked up during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// In-memory index built once per run (default)
    #[default]
    Index,
    /// One SQL query per strategy attempt
    Store,
}

impl LookupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupMode::Index => "index",
            LookupMode::Store => "store",
        }
    }
}

impl FromStr for LookupMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(LookupMode::Index),
            "store" => Ok(LookupMode::Store),
            other => Err(ConfigError::InvalidValue {
                key: "engine.lookup",
                value: other.to_string(),
                expected: "\"index\" or \"store\"",
            }),
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSettings {
    pub elevate: Option<PathBuf>,
    pub crm: Option<PathBuf>,
    pub cancelled: Option<PathBuf>,
    pub failed: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub pre: Option<PathBuf>,
    pub post: Option<PathBuf>,
    pub check: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub lookup: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: Option<String>,
}

/// Every field is optional; anything unset falls back to the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    /// Directory that relative paths and default file names resolve against
    pub base_dir: Option<PathBuf>,
    pub database: DatabaseSettings,
    pub inputs: InputSettings,
    pub outputs: OutputSettings,
    pub engine: EngineSettings,
    pub log: LogSettings,
}

impl RunSettings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mandates").join("config.toml"))
    }

    /// Load `explicit` if given (it must exist), else the default location if
    /// it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse { path: path.to_path_buf(), message },
            other => other,
        })?;
        tracing::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate. Parse errors carry an empty path; `from_file` fills it in.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: RunSettings = toml::from_str(input).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lookup_mode()?;
        if let Some(level) = &self.log.level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "log.level",
                    value: level.clone(),
                    expected: "one of off, error, warn, info, debug, trace",
                });
            }
        }
        Ok(())
    }

    /// Lookup mode from `[engine] lookup`, defaulting to the index.
    pub fn lookup_mode(&self) -> Result<LookupMode, ConfigError> {
        match &self.engine.lookup {
            Some(value) => value.parse(),
            None => Ok(LookupMode::default()),
        }
    }
}
