//! File locations for one run.
//!
//! Each path comes from the command line if given, else the settings file,
//! else a default name stamped with the run date. Relative settings paths and
//! default names resolve against the base directory; command-line paths are
//! used as given.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use mandates_recon::DATE_FORMAT;

use crate::settings::RunSettings;

pub const DEFAULT_DATABASE_FILE: &str = "cancelled-mandates-database.sqlite3";

/// Paths supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub database: Option<PathBuf>,
    pub elevate: Option<PathBuf>,
    pub crm: Option<PathBuf>,
    pub cancelled: Option<PathBuf>,
    pub failed: Option<PathBuf>,
    pub pre: Option<PathBuf>,
    pub post: Option<PathBuf>,
    pub check: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub database: PathBuf,
    pub elevate: PathBuf,
    pub crm: PathBuf,
    pub cancelled: PathBuf,
    pub failed: PathBuf,
    pub pre: PathBuf,
    pub post: PathBuf,
    pub check: PathBuf,
}

/// Directory holding the running executable, or `.` if it cannot be found.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn dated(stem: &str, date: NaiveDate) -> String {
    format!("{stem}-{}.csv", date.format(DATE_FORMAT))
}

impl RunPaths {
    /// Resolve every path. `fallback_base` is used when settings name no base dir.
    pub fn resolve(
        settings: &RunSettings,
        overrides: &PathOverrides,
        date: NaiveDate,
        fallback_base: &Path,
    ) -> Self {
        let base = settings.base_dir.as_deref().unwrap_or(fallback_base);

        let pick = |cli: &Option<PathBuf>, file: &Option<PathBuf>, default: String| -> PathBuf {
            match (cli, file) {
                (Some(path), _) => path.clone(),
                (None, Some(path)) => base.join(path),
                (None, None) => base.join(default),
            }
        };

        Self {
            database: pick(&overrides.database, &settings.database.path, DEFAULT_DATABASE_FILE.to_string()),
            elevate: pick(&overrides.elevate, &settings.inputs.elevate, dated("elevate-accounts", date)),
            crm: pick(&overrides.crm, &settings.inputs.crm, dated("crm-accounts", date)),
            cancelled: pick(&overrides.cancelled, &settings.inputs.cancelled, dated("cancelled-mandates", date)),
            failed: pick(&overrides.failed, &settings.inputs.failed, dated("failed-mandates", date)),
            pre: pick(
                &overrides.pre,
                &settings.outputs.pre,
                dated("mandates-to-process-by-pre-installation-team", date),
            ),
            post: pick(
                &overrides.post,
                &settings.outputs.post,
                dated("mandates-to-process-by-post-installation-team", date),
            ),
            check: pick(&overrides.check, &settings.outputs.check, dated("mandates-to-check", date)),
        }
    }
}
