use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// Settings file exists but cannot be read.
    Read { path: PathBuf, source: std::io::Error },
    /// TOML syntax or shape error.
    Parse { path: PathBuf, message: String },
    /// A value parsed but is not one we accept.
    InvalidValue { key: &'static str, value: String, expected: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse { path, message } => write!(f, "{}: {message}", path.display()),
            Self::InvalidValue { key, value, expected } => {
                write!(f, "invalid {key} '{value}', expected {expected}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}
