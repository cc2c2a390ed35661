//! The daily batch behind `cm run`, `cm import` and `cm export`.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use mandates_config::{LookupMode, RunPaths};
use mandates_io::{
    import_crm_accounts, import_elevate_accounts, import_mandate_events, ExportPaths, ExportReport,
    IngestReport, Partitioner, Store,
};
use mandates_recon::resolve::CASCADE;
use mandates_recon::{run, CrmLookup, Destination, MandateEvent, ReferenceIndex, RunSummary, DATE_FORMAT};

use crate::exit_codes::{EXIT_INPUT, EXIT_OUTPUT};
use crate::CliError;

#[derive(Debug, Clone, Copy)]
pub struct Phases {
    pub import: bool,
    pub export: bool,
}

/// Everything one invocation did; printed to stderr, or as JSON with `--json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_date: String,
    pub lookup: &'static str,
    pub database: PathBuf,
    pub imports: Vec<IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<ExportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ExportPaths>,
}

pub fn execute(phases: Phases, paths: &RunPaths, date: NaiveDate, lookup: LookupMode) -> Result<RunReport, CliError> {
    let mut store = Store::open(&paths.database).map_err(|e| CliError::io(e, EXIT_INPUT))?;
    info!("store open at {}", paths.database.display());

    let mut report = RunReport {
        run_date: date.format(DATE_FORMAT).to_string(),
        lookup: lookup.as_str(),
        database: paths.database.clone(),
        imports: Vec::new(),
        summary: None,
        exports: None,
        outputs: None,
    };

    if phases.import {
        report.imports = import_sources(&mut store, paths, date)?;
    }

    if phases.export {
        let outputs = ExportPaths {
            pre_team: paths.pre.clone(),
            post_team: paths.post.clone(),
            check: paths.check.clone(),
        };
        let (summary, exports) = export_day(&store, &outputs, &report.run_date, lookup)?;
        report.summary = Some(summary);
        report.exports = Some(exports);
        report.outputs = Some(outputs);
    }

    Ok(report)
}

fn import_sources(store: &mut Store, paths: &RunPaths, date: NaiveDate) -> Result<Vec<IngestReport>, CliError> {
    let io = |e| CliError::io(e, EXIT_INPUT);
    let reports = vec![
        import_elevate_accounts(store, &paths.elevate).map_err(io)?,
        import_crm_accounts(store, &paths.crm).map_err(io)?,
        import_mandate_events(store, &paths.cancelled, date).map_err(io)?,
        import_mandate_events(store, &paths.failed, date).map_err(io)?,
    ];
    let (elevate, crm, events) = store.table_counts().map_err(io)?;
    info!(elevate, crm, events, "import complete");
    Ok(reports)
}

fn export_day(
    store: &Store,
    outputs: &ExportPaths,
    run_date: &str,
    lookup: LookupMode,
) -> Result<(RunSummary, ExportReport), CliError> {
    let events = store.events_imported_on(run_date).map_err(|e| CliError::io(e, EXIT_INPUT))?;
    info!("{} event(s) imported on {run_date}", events.len());

    let mut partitioner = Partitioner::create(outputs).map_err(|e| CliError::io(e, EXIT_OUTPUT))?;

    let summary = match lookup {
        LookupMode::Index => {
            let crm = store.crm_accounts().map_err(|e| CliError::io(e, EXIT_INPUT))?;
            let elevate = store.elevate_accounts().map_err(|e| CliError::io(e, EXIT_INPUT))?;
            let index = ReferenceIndex::build(crm, elevate);
            info!(
                crm = index.crm_count(),
                elevate = index.elevate_count(),
                "reference index built"
            );
            resolve_into(events, &index, &mut partitioner)?
        }
        LookupMode::Store => resolve_into(events, store, &mut partitioner)?,
    };

    let exports = partitioner.finish().map_err(|e| CliError::io(e, EXIT_OUTPUT))?;
    Ok((summary, exports))
}

/// Resolve, route and write one event at a time.
fn resolve_into<L: CrmLookup>(
    events: Vec<MandateEvent>,
    lookup: &L,
    partitioner: &mut Partitioner<BufWriter<File>>,
) -> Result<RunSummary, CliError> {
    let summary = run(events, lookup, |record| partitioner.write(&record).map(drop))
        .map_err(|e| CliError::io(e, EXIT_OUTPUT))?;
    info!(
        total = summary.total_events,
        matched = summary.matched,
        unmatched = summary.unmatched,
        "resolution complete"
    );
    Ok(summary)
}

/// Human summary to stderr.
pub fn print_summary(report: &RunReport) {
    for import in &report.imports {
        if import.file_missing {
            eprintln!("{}: not found, skipped ({})", import.kind, import.file.display());
            continue;
        }
        eprintln!(
            "{}: {} read, {} inserted, {} updated, {} duplicates, {} failed",
            import.kind, import.rows_read, import.inserted, import.updated, import.skipped, import.failed,
        );
    }

    if let Some(s) = &report.summary {
        let methods = CASCADE
            .iter()
            .map(|m| format!("{m} {}", s.matched_by(*m)))
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!(
            "{}: {} event(s), {} matched ({methods}), {} unmatched",
            report.run_date, s.total_events, s.matched, s.unmatched,
        );
        if s.diagnostics > 0 {
            eprintln!("{} lookup error(s); affected events fell through to later strategies", s.diagnostics);
        }
    }

    if let (Some(exports), Some(outputs)) = (&report.exports, &report.outputs) {
        for destination in Destination::ALL {
            eprintln!("wrote {} row(s) to {}", exports.rows(destination), outputs.get(destination).display());
        }
    }
}
