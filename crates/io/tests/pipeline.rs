// Ingest fixture exports into a store, resolve the day's events, and write
// the three team files.
// Run with: cargo test -p mandates-io --test pipeline

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use mandates_io::{
    import_crm_accounts, import_elevate_accounts, import_mandate_events, ExportPaths, IoError,
    IngestReport, Partitioner, Store,
};
use mandates_recon::model::OUTPUT_HEADER;
use mandates_recon::{reconcile, Destination, MatchMethod, ReferenceIndex, TargetTeam, DATE_FORMAT};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

fn import_all(store: &mut Store) -> Vec<IngestReport> {
    vec![
        import_elevate_accounts(store, &fixture("elevate-accounts.csv")).unwrap(),
        import_crm_accounts(store, &fixture("crm-accounts.csv")).unwrap(),
        import_mandate_events(store, &fixture("cancelled-mandates.csv"), run_date()).unwrap(),
        import_mandate_events(store, &fixture("failed-mandates.csv"), run_date()).unwrap(),
    ]
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

// -------------------------------------------------------------------------
// Ingestion
// -------------------------------------------------------------------------

#[test]
fn ingest_reports_per_file() {
    let mut store = Store::open_in_memory().unwrap();
    let reports = import_all(&mut store);

    let elevate = &reports[0];
    assert_eq!((elevate.rows_read, elevate.inserted, elevate.skipped, elevate.failed), (4, 2, 1, 1));

    let crm = &reports[1];
    assert_eq!((crm.rows_read, crm.inserted, crm.updated, crm.failed), (7, 5, 1, 1));

    let cancelled = &reports[2];
    assert_eq!((cancelled.rows_read, cancelled.inserted), (4, 4));

    // EVC1 appears in both event files
    let failed = &reports[3];
    assert_eq!((failed.rows_read, failed.inserted, failed.skipped), (3, 2, 1));

    assert_eq!(store.table_counts().unwrap(), (2, 5, 6));
}

#[test]
fn reingestion_is_idempotent() {
    let mut store = Store::open_in_memory().unwrap();
    import_all(&mut store);
    let before = store.table_counts().unwrap();

    let again = import_all(&mut store);
    assert_eq!(store.table_counts().unwrap(), before);
    assert!(again.iter().all(|r| r.inserted == 0));
    // CRM rows are upserted, event and billing rows skipped
    assert_eq!(again[1].updated, 6);
    assert_eq!(again[2].skipped, 4);
}

#[test]
fn first_billing_row_wins_and_crm_updates_apply() {
    let mut store = Store::open_in_memory().unwrap();
    import_all(&mut store);

    let elevate = store.elevate_accounts().unwrap();
    let acc9 = elevate.iter().find(|a| a.account_number == "ACC9").unwrap();
    assert_eq!(acc9.mandate_reference, "M100");

    let crm = store.crm_accounts().unwrap();
    let crm2 = crm.iter().find(|a| a.crm_id == "CRM2").unwrap();
    assert_eq!(crm2.stage_name, "INVOICING");
    assert_eq!(crm2.email, "grace.h@example.com");
}

#[test]
fn imported_events_carry_derived_columns() {
    let mut store = Store::open_in_memory().unwrap();
    import_all(&mut store);

    let events = store.events_imported_on("2026-10-14").unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["EVC1", "EVC2", "EVC3", "EVC4", "EVF1", "EVF2"]);

    let first = &events[0];
    assert_eq!(first.customers_name, "Ada Lovelace");
    assert_eq!(first.details_description, "Mandate cancelled, bank notified");
    assert_eq!(first.customers_metadata_xero, "");
    assert_eq!(first.mandates_metadata_xero, "");
    assert_eq!(first.imported_at, run_date().format(DATE_FORMAT).to_string());
    assert!(store.events_imported_on("2026-10-13").unwrap().is_empty());
}

#[test]
fn missing_input_file_is_skipped() {
    let mut store = Store::open_in_memory().unwrap();
    let report = import_crm_accounts(&mut store, &fixture("no-such-file.csv")).unwrap();
    assert!(report.file_missing);
    assert_eq!(report.rows_read, 0);
    assert_eq!(store.table_counts().unwrap(), (0, 0, 0));
}

#[test]
fn empty_input_file_is_missing_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "").unwrap();

    let mut store = Store::open_in_memory().unwrap();
    match import_mandate_events(&mut store, &path, run_date()) {
        Err(IoError::MissingHeader { path: p }) => assert_eq!(p, path),
        other => panic!("expected MissingHeader, got {other:?}"),
    }
}

// -------------------------------------------------------------------------
// Resolution and export
// -------------------------------------------------------------------------

#[test]
fn fixture_day_partitions_into_three_files() {
    let mut store = Store::open_in_memory().unwrap();
    import_all(&mut store);
    let index = ReferenceIndex::build(store.crm_accounts().unwrap(), store.elevate_accounts().unwrap());

    let dir = tempfile::tempdir().unwrap();
    let paths = ExportPaths {
        pre_team: dir.path().join("pre.csv"),
        post_team: dir.path().join("post.csv"),
        check: dir.path().join("check.csv"),
    };

    let mut partitioner = Partitioner::create(&paths).unwrap();
    let mut routed = Vec::new();
    for event in store.events_imported_on("2026-10-14").unwrap() {
        let (record, diagnostics) = reconcile(event, &index);
        assert!(diagnostics.is_empty());
        routed.push((record.event.id.clone(), record.method, record.target_team));
        partitioner.write(&record).unwrap();
    }
    let report = partitioner.finish().unwrap();

    assert_eq!(
        routed,
        vec![
            ("EVC1".to_string(), Some(MatchMethod::LeadId), TargetTeam::PreInstallation),
            ("EVC2".to_string(), Some(MatchMethod::MandateBridge), TargetTeam::PostInstallation),
            ("EVC3".to_string(), Some(MatchMethod::CustomerId), TargetTeam::NoActionInactive),
            ("EVC4".to_string(), Some(MatchMethod::CustomerName), TargetTeam::NoActionAtOurRequest),
            ("EVF1".to_string(), Some(MatchMethod::LeadId), TargetTeam::PostInstallation),
            ("EVF2".to_string(), None, TargetTeam::PreInstallation),
        ]
    );
    assert_eq!(report.total(), 6);
    for destination in Destination::ALL {
        assert_eq!(report.rows(destination), 2, "{destination}");
    }

    let col = |name: &str| OUTPUT_HEADER.iter().position(|h| *h == name).unwrap();

    let pre = read_rows(&paths.pre_team);
    assert_eq!(pre[0], OUTPUT_HEADER.to_vec());
    assert_eq!(pre[1][col("id")], "EVC1");
    assert_eq!(pre[1][col("crm_premise_address")], "1 Loop Road");
    assert_eq!(pre[2][col("id")], "EVF2");
    assert_eq!(pre[2][col("crm_id")], "");
    assert_eq!(pre[2][col("crm_stage_name")], "");
    assert_eq!(pre[2][col("target_team")], "Pre-Installation");

    let post = read_rows(&paths.post_team);
    assert_eq!(post[1][col("crm_id")], "CRM9");
    assert_eq!(post[1][col("crm_zen_user_id")], "Z9");
    assert_eq!(post[2][col("crm_account_number")], "ACC2");

    let check = read_rows(&paths.check);
    assert_eq!(check[1][col("target_team")], "No action - Inactive");
    assert_eq!(check[2][col("target_team")], "No action - at our request");
    assert_eq!(check[2][col("crm_stage_name")], "INSTALL");
    assert!(check.iter().all(|row| row.len() == OUTPUT_HEADER.len()));
}

#[test]
fn store_lookup_matches_index_lookup_on_fixture_day() {
    let mut store = Store::open_in_memory().unwrap();
    import_all(&mut store);
    let index = ReferenceIndex::build(store.crm_accounts().unwrap(), store.elevate_accounts().unwrap());

    for event in store.events_imported_on("2026-10-14").unwrap() {
        let (from_index, _) = reconcile(event.clone(), &index);
        let (from_store, diagnostics) = reconcile(event, &store);
        assert!(diagnostics.is_empty());
        assert_eq!(from_index.profile, from_store.profile);
        assert_eq!(from_index.target_team, from_store.target_team);
        assert_eq!(from_index.method, from_store.method);
    }
}
