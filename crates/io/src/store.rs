// Reference store on SQLite

use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};

use mandates_recon::model::{CrmAccount, ElevateAccount, MandateEvent};
use mandates_recon::CrmLookup;

use crate::error::IoError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS elevateAccounts (
    elevate_account_number    TEXT PRIMARY KEY,
    elevate_mandate_reference TEXT,
    elevate_customer_name     TEXT
);

CREATE TABLE IF NOT EXISTS crmAccounts (
    crm_id              TEXT PRIMARY KEY,
    crm_account_number  TEXT,
    crm_name            TEXT,
    crm_email           TEXT,
    crm_premise_address TEXT,
    crm_stage_name      TEXT,
    crm_gocardless_id   TEXT,
    crm_zen_user_id     TEXT
);

CREATE TABLE IF NOT EXISTS mandateEvents (
    id                                   TEXT PRIMARY KEY,
    created_at                           TEXT,
    resource_type                        TEXT,
    action                               TEXT,
    details_origin                       TEXT,
    details_cause                        TEXT,
    details_description                  TEXT,
    details_scheme                       TEXT,
    details_reason_code                  TEXT,
    links_previous_customer_bank_account TEXT,
    links_new_customer_bank_account      TEXT,
    links_parent_event                   TEXT,
    links_mandate                        TEXT,
    mandates_id                          TEXT,
    mandates_created_at                  TEXT,
    mandates_reference                   TEXT,
    mandates_status                      TEXT,
    mandates_scheme                      TEXT,
    mandates_next_possible_charge_date   TEXT,
    mandates_payments_require_approval   TEXT,
    mandates_links_customer_bank_account TEXT,
    mandates_links_creditor              TEXT,
    customers_id                         TEXT,
    customers_given_name                 TEXT,
    customers_family_name                TEXT,
    customers_company_name               TEXT,
    customers_metadata_leadID            TEXT,
    customers_metadata_link              TEXT,
    customers_metadata_xero              TEXT,
    mandates_metadata_xero               TEXT,
    imported_at                          TEXT,
    customers_name                       TEXT
);

CREATE INDEX IF NOT EXISTS idx_mandate_events_imported_at
    ON mandateEvents(imported_at);
CREATE INDEX IF NOT EXISTS idx_crm_accounts_crm_account_number
    ON crmAccounts(crm_account_number);
CREATE INDEX IF NOT EXISTS idx_crm_accounts_crm_name
    ON crmAccounts(crm_name);
CREATE INDEX IF NOT EXISTS idx_crm_accounts_crm_gocardless_id
    ON crmAccounts(crm_gocardless_id);
CREATE INDEX IF NOT EXISTS idx_elevate_accounts_elevate_mandate_reference
    ON elevateAccounts(elevate_mandate_reference);
"#;

macro_rules! event_columns {
    () => {
        "id, created_at, resource_type, action, details_origin, details_cause, \
         details_description, details_scheme, details_reason_code, \
         links_previous_customer_bank_account, links_new_customer_bank_account, \
         links_parent_event, links_mandate, mandates_id, mandates_created_at, \
         mandates_reference, mandates_status, mandates_scheme, \
         mandates_next_possible_charge_date, mandates_payments_require_approval, \
         mandates_links_customer_bank_account, mandates_links_creditor, customers_id, \
         customers_given_name, customers_family_name, customers_company_name, \
         customers_metadata_leadID, customers_metadata_link, customers_metadata_xero, \
         mandates_metadata_xero, imported_at, customers_name"
    };
}

// Every CRM query aliases crmAccounts as `c`.
macro_rules! select_crm {
    () => {
        "SELECT c.crm_id, c.crm_account_number, c.crm_name, c.crm_email, \
         c.crm_premise_address, c.crm_stage_name, c.crm_gocardless_id, c.crm_zen_user_id "
    };
}

const INSERT_ELEVATE: &str = "
    INSERT INTO elevateAccounts (elevate_account_number, elevate_mandate_reference, elevate_customer_name)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(elevate_account_number) DO NOTHING";

const UPSERT_CRM: &str = "
    INSERT INTO crmAccounts (
        crm_id, crm_account_number, crm_name, crm_email,
        crm_premise_address, crm_stage_name, crm_gocardless_id, crm_zen_user_id
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(crm_id) DO UPDATE SET
        crm_name            = excluded.crm_name,
        crm_email           = excluded.crm_email,
        crm_premise_address = excluded.crm_premise_address,
        crm_stage_name      = excluded.crm_stage_name,
        crm_gocardless_id   = excluded.crm_gocardless_id,
        crm_zen_user_id     = excluded.crm_zen_user_id";

const INSERT_EVENT: &str = concat!(
    "INSERT INTO mandateEvents (",
    event_columns!(),
    ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
               ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT(id) DO NOTHING"
);

const SELECT_EVENTS_ON: &str = concat!(
    "SELECT ",
    event_columns!(),
    " FROM mandateEvents WHERE imported_at = ?1 ORDER BY rowid"
);

const SELECT_CRM_ALL: &str = concat!(select_crm!(), "FROM crmAccounts c ORDER BY c.rowid");

const SELECT_CRM_BY_ID_OR_ACCOUNT: &str = concat!(
    select_crm!(),
    "FROM crmAccounts c WHERE c.crm_id = ?1 OR c.crm_account_number = ?1 ORDER BY c.rowid"
);

const SELECT_CRM_BY_MANDATE_REFERENCE: &str = concat!(
    select_crm!(),
    "FROM elevateAccounts e \
     INNER JOIN crmAccounts c ON e.elevate_account_number = c.crm_account_number \
     WHERE e.elevate_mandate_reference = ?1 ORDER BY e.rowid, c.rowid"
);

const SELECT_CRM_BY_PROCESSOR_ID: &str =
    concat!(select_crm!(), "FROM crmAccounts c WHERE c.crm_gocardless_id = ?1 ORDER BY c.rowid");

const SELECT_CRM_BY_NAME: &str =
    concat!(select_crm!(), "FROM crmAccounts c WHERE c.crm_name = ?1 ORDER BY c.rowid");

/// Result of writing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    /// Key already present on an insert-or-skip table.
    Skipped,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Begin a write transaction. Dropping the writer without `commit` rolls back.
    pub fn writer(&mut self) -> Result<StoreWriter<'_>, IoError> {
        Ok(StoreWriter { tx: self.conn.transaction()? })
    }

    /// Events whose `imported_at` equals `date`, in insertion order.
    pub fn events_imported_on(&self, date: &str) -> Result<Vec<MandateEvent>, IoError> {
        let mut stmt = self.conn.prepare(SELECT_EVENTS_ON)?;
        let rows = stmt.query_map(params![date], event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn crm_accounts(&self) -> Result<Vec<CrmAccount>, IoError> {
        let mut stmt = self.conn.prepare(SELECT_CRM_ALL)?;
        let rows = stmt.query_map([], crm_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn elevate_accounts(&self) -> Result<Vec<ElevateAccount>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT elevate_account_number, elevate_mandate_reference, elevate_customer_name \
             FROM elevateAccounts ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ElevateAccount {
                account_number: text(row, 0)?,
                mandate_reference: text(row, 1)?,
                customer_name: text(row, 2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Row counts of (elevateAccounts, crmAccounts, mandateEvents).
    pub fn table_counts(&self) -> Result<(usize, usize, usize), IoError> {
        let count = |table: &str| -> Result<usize, IoError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok((count("elevateAccounts")?, count("crmAccounts")?, count("mandateEvents")?))
    }

    fn query_crm(&self, sql: &str, key: &str) -> rusqlite::Result<Vec<CrmAccount>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![key], crm_from_row)?;
        rows.collect()
    }
}

/// Lookups answered directly by SQL, one query per strategy attempt.
impl CrmLookup for Store {
    type Error = rusqlite::Error;

    fn by_id_or_account_number(&self, key: &str) -> Result<Vec<CrmAccount>, Self::Error> {
        self.query_crm(SELECT_CRM_BY_ID_OR_ACCOUNT, key)
    }

    fn by_bridged_mandate_reference(&self, mandate_id: &str) -> Result<Vec<CrmAccount>, Self::Error> {
        self.query_crm(SELECT_CRM_BY_MANDATE_REFERENCE, mandate_id)
    }

    fn by_processor_id(&self, customer_id: &str) -> Result<Vec<CrmAccount>, Self::Error> {
        self.query_crm(SELECT_CRM_BY_PROCESSOR_ID, customer_id)
    }

    fn by_exact_name(&self, name: &str) -> Result<Vec<CrmAccount>, Self::Error> {
        self.query_crm(SELECT_CRM_BY_NAME, name)
    }
}

pub struct StoreWriter<'s> {
    tx: Transaction<'s>,
}

impl StoreWriter<'_> {
    /// Insert-or-skip on account number.
    pub fn insert_elevate_account(&self, a: &ElevateAccount) -> rusqlite::Result<WriteOutcome> {
        let changed = self.tx.prepare_cached(INSERT_ELEVATE)?.execute(params![
            a.account_number,
            a.mandate_reference,
            a.customer_name,
        ])?;
        Ok(if changed == 0 { WriteOutcome::Skipped } else { WriteOutcome::Inserted })
    }

    /// Upsert on CRM id. The account number of an existing row is kept.
    pub fn upsert_crm_account(&self, a: &CrmAccount) -> rusqlite::Result<WriteOutcome> {
        let existed = self
            .tx
            .prepare_cached("SELECT 1 FROM crmAccounts WHERE crm_id = ?1")?
            .query_row(params![a.crm_id], |_| Ok(()))
            .optional()?
            .is_some();

        self.tx.prepare_cached(UPSERT_CRM)?.execute(params![
            a.crm_id,
            a.account_number,
            a.name,
            a.email,
            a.premise_address,
            a.stage_name,
            a.processor_id,
            a.support_user_id,
        ])?;
        Ok(if existed { WriteOutcome::Updated } else { WriteOutcome::Inserted })
    }

    /// Insert-or-skip on event id.
    pub fn insert_mandate_event(&self, e: &MandateEvent) -> rusqlite::Result<WriteOutcome> {
        let changed = self.tx.prepare_cached(INSERT_EVENT)?.execute(params_from_iter(e.fields()))?;
        Ok(if changed == 0 { WriteOutcome::Skipped } else { WriteOutcome::Inserted })
    }

    pub fn commit(self) -> Result<(), IoError> {
        self.tx.commit()?;
        Ok(())
    }
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn crm_from_row(row: &Row<'_>) -> rusqlite::Result<CrmAccount> {
    Ok(CrmAccount {
        crm_id: text(row, 0)?,
        account_number: text(row, 1)?,
        name: text(row, 2)?,
        email: text(row, 3)?,
        premise_address: text(row, 4)?,
        stage_name: text(row, 5)?,
        processor_id: text(row, 6)?,
        support_user_id: text(row, 7)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<MandateEvent> {
    let values = (0..mandates_recon::model::EVENT_COLUMN_COUNT)
        .map(|i| text(row, i))
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(MandateEvent::from_fields(values.iter().map(String::as_str)))
}
