//! CSV ingestion into the reference store.
//!
//! Source files are positional exports with a header row. A missing file is
//! skipped; an unreadable header is fatal; anything wrong with a single data
//! row is logged, counted and skipped.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info, warn};

use mandates_recon::model::{CrmAccount, ElevateAccount, MandateEvent, DATE_FORMAT};

use crate::decode::read_file_as_utf8;
use crate::error::IoError;
use crate::store::{Store, StoreWriter, WriteOutcome};

/// Columns 0..=27 of a mandate event export map onto the first event fields.
const EVENT_SOURCE_COLUMNS: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ElevateAccounts,
    CrmAccounts,
    MandateEvents,
}

impl SourceKind {
    /// Narrowest row that still carries every mapped column.
    pub fn min_columns(&self) -> usize {
        match self {
            Self::ElevateAccounts => 31,
            Self::CrmAccounts => 11,
            Self::MandateEvents => EVENT_SOURCE_COLUMNS,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElevateAccounts => write!(f, "elevate accounts"),
            Self::CrmAccounts => write!(f, "CRM accounts"),
            Self::MandateEvents => write!(f, "mandate events"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kind: SourceKind,
    pub file: PathBuf,
    pub file_missing: bool,
    pub rows_read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestReport {
    fn new(kind: SourceKind, file: &Path) -> Self {
        Self {
            kind,
            file: file.to_path_buf(),
            file_missing: false,
            rows_read: 0,
            inserted: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn field(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}

/// Billing export: account number, customer name, mandate reference.
pub fn elevate_from_record(record: &StringRecord) -> Option<ElevateAccount> {
    if record.len() < SourceKind::ElevateAccounts.min_columns() {
        return None;
    }
    Some(ElevateAccount {
        account_number: field(record, 0),
        customer_name: field(record, 2),
        mandate_reference: field(record, 30),
    })
}

/// CRM export layout.
pub fn crm_from_record(record: &StringRecord) -> Option<CrmAccount> {
    if record.len() < SourceKind::CrmAccounts.min_columns() {
        return None;
    }
    Some(CrmAccount {
        account_number: field(record, 0),
        premise_address: field(record, 2),
        stage_name: field(record, 4),
        name: field(record, 6),
        email: field(record, 7),
        processor_id: field(record, 8),
        crm_id: field(record, 9),
        support_user_id: field(record, 10),
    })
}

/// Cancelled/failed mandate export. Xero metadata is not carried over.
pub fn event_from_record(record: &StringRecord, imported_at: &str) -> Option<MandateEvent> {
    if record.len() < EVENT_SOURCE_COLUMNS {
        return None;
    }
    let name = MandateEvent::compose_name(record.get(23).unwrap_or(""), record.get(24).unwrap_or(""));
    let source = record.iter().take(EVENT_SOURCE_COLUMNS);
    let derived = ["", "", imported_at, name.as_str()];
    Some(MandateEvent::from_fields(source.chain(derived)))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

pub fn import_elevate_accounts(store: &mut Store, path: &Path) -> Result<IngestReport, IoError> {
    import_file(store, path, SourceKind::ElevateAccounts, |w, record| {
        let account = elevate_from_record(record)?;
        debug!(account_number = %account.account_number, "elevate account");
        Some(w.insert_elevate_account(&account))
    })
}

pub fn import_crm_accounts(store: &mut Store, path: &Path) -> Result<IngestReport, IoError> {
    import_file(store, path, SourceKind::CrmAccounts, |w, record| {
        let account = crm_from_record(record)?;
        debug!(crm_id = %account.crm_id, account_number = %account.account_number, "CRM account");
        Some(w.upsert_crm_account(&account))
    })
}

/// Import one cancelled or failed mandates file, stamping rows with `run_date`.
pub fn import_mandate_events(
    store: &mut Store,
    path: &Path,
    run_date: NaiveDate,
) -> Result<IngestReport, IoError> {
    let imported_at = run_date.format(DATE_FORMAT).to_string();
    import_file(store, path, SourceKind::MandateEvents, |w, record| {
        let event = event_from_record(record, &imported_at)?;
        debug!(id = %event.id, "mandate event");
        Some(w.insert_mandate_event(&event))
    })
}

/// Shared loop. `apply` returns `None` when the row is too short to map.
fn import_file<F>(
    store: &mut Store,
    path: &Path,
    kind: SourceKind,
    mut apply: F,
) -> Result<IngestReport, IoError>
where
    F: FnMut(&StoreWriter<'_>, &StringRecord) -> Option<rusqlite::Result<WriteOutcome>>,
{
    let mut report = IngestReport::new(kind, path);

    if !path.exists() {
        warn!("no {kind} file at {}, skipping", path.display());
        report.file_missing = true;
        return Ok(report);
    }

    let content = read_file_as_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header_ok = reader.headers().map(|h| !h.is_empty()).unwrap_or(false);
    if !header_ok {
        return Err(IoError::MissingHeader { path: path.to_path_buf() });
    }

    let writer = store.writer()?;

    for (n, result) in reader.records().enumerate() {
        // header is line 1
        let line = n + 2;
        report.rows_read += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("{}: line {line}: unreadable {kind} row: {e}", path.display());
                report.failed += 1;
                continue;
            }
        };

        match apply(&writer, &record) {
            Some(Ok(WriteOutcome::Inserted)) => report.inserted += 1,
            Some(Ok(WriteOutcome::Updated)) => report.updated += 1,
            Some(Ok(WriteOutcome::Skipped)) => {
                debug!("{}: line {line}: existing {kind} row skipped", path.display());
                report.skipped += 1;
            }
            Some(Err(e)) => {
                warn!("{}: line {line}: insert failed: {e}", path.display());
                report.failed += 1;
            }
            None => {
                warn!(
                    "{}: line {line}: {} column(s), {kind} rows need at least {}",
                    path.display(),
                    record.len(),
                    kind.min_columns()
                );
                report.failed += 1;
            }
        }
    }

    writer.commit()?;

    info!(
        "{kind}: {} row(s) read, {} inserted, {} updated, {} skipped, {} failed",
        report.rows_read, report.inserted, report.updated, report.skipped, report.failed
    );
    Ok(report)
}
