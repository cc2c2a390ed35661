use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum IoError {
    /// SQLite open / schema / statement error.
    Sqlite(rusqlite::Error),
    /// CSV reader or writer error outside a single data row.
    Csv(csv::Error),
    /// File system error.
    Io(std::io::Error),
    /// Input file is empty or its header row cannot be read.
    MissingHeader { path: PathBuf },
    /// Output file cannot be created.
    OutputUnwritable { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "store error: {e}"),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::MissingHeader { path } => {
                write!(f, "{}: missing header row", path.display())
            }
            Self::OutputUnwritable { path, source } => {
                write!(f, "cannot write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::OutputUnwritable { source, .. } => Some(source),
            Self::MissingHeader { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for IoError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
