use std::convert::Infallible;

use mandates_recon::classify::Destination;
use mandates_recon::model::{CrmAccount, ElevateAccount, MandateEvent, ResolvedRecord};
use mandates_recon::{run, MatchMethod, ReferenceIndex, RunSummary, TargetTeam, OUTPUT_HEADER};

fn crm(id: &str, account: &str, name: &str, processor: &str, stage: &str) -> CrmAccount {
    CrmAccount {
        crm_id: id.into(),
        account_number: account.into(),
        name: name.into(),
        email: format!("{}@example.com", id.to_lowercase()),
        premise_address: format!("{id} High Street"),
        stage_name: stage.into(),
        processor_id: processor.into(),
        support_user_id: format!("zen-{id}"),
    }
}

fn elevate(account: &str, mandate: &str) -> ElevateAccount {
    ElevateAccount {
        account_number: account.into(),
        mandate_reference: mandate.into(),
        customer_name: String::new(),
    }
}

fn reference() -> ReferenceIndex {
    ReferenceIndex::build(
        vec![
            crm("CRM1", "ACC1", "Ada Lovelace", "CU1", "SOLD"),
            crm("CRM2", "ACC2", "Grace Hopper", "CU2", "ACTIVE"),
            crm("CRM9", "ACC9", "Alan Turing", "CU9", "PROVISIONING"),
            crm("CRM4", "ACC4", "Edsger Dijkstra", "CU4", "INACTIVE"),
            crm("", "", "Ghost Row", "CU_GHOST", "ACTIVE"),
        ],
        vec![elevate("ACC9", "M100"), elevate("ACC4", "M400")],
    )
}

fn event(id: &str) -> MandateEvent {
    MandateEvent {
        id: id.into(),
        imported_at: "2026-10-14".into(),
        details_description: "The mandate was cancelled".into(),
        ..Default::default()
    }
}

fn reconcile_all(events: Vec<MandateEvent>) -> (Vec<ResolvedRecord>, RunSummary) {
    let mut records = Vec::new();
    let summary = run(events, &reference(), |record| {
        records.push(record);
        Ok::<_, Infallible>(())
    })
    .unwrap();
    (records, summary)
}

// -------------------------------------------------------------------------
// Cascade
// -------------------------------------------------------------------------

#[test]
fn end_to_end_mandate_bridge_example() {
    let mut e = event("EVT1");
    e.mandates_id = "M100".into();
    e.details_description = "customer cancelled mandate".into();

    let (records, summary) = reconcile_all(vec![e]);
    let record = &records[0];
    assert_eq!(record.method, Some(MatchMethod::MandateBridge));
    assert_eq!(record.profile.crm_id, "CRM9");
    assert_eq!(record.profile.account_number, "ACC9");
    assert_eq!(record.target_team, TargetTeam::PostInstallation);
    assert_eq!(record.target_team.destination(), Destination::PostTeam);
    assert_eq!(summary.rows_for(Destination::PostTeam), 1);
    assert_eq!(summary.rows_for(Destination::PreTeam), 0);
    assert_eq!(summary.rows_for(Destination::Check), 0);
}

#[test]
fn lead_id_takes_priority_over_name() {
    let mut e = event("EVT2");
    e.customers_metadata_lead_id = "ACC2".into();
    e.customers_name = "Ada Lovelace".into();

    let (records, _) = reconcile_all(vec![e]);
    let record = &records[0];
    assert_eq!(record.method, Some(MatchMethod::LeadId));
    assert_eq!(record.profile.crm_id, "CRM2");
    assert_eq!(record.target_team, TargetTeam::PostInstallation);
}

#[test]
fn identity_less_processor_match_falls_through_to_name() {
    let mut e = event("EVT3");
    e.customers_id = "CU_GHOST".into();
    e.customers_name = "Edsger Dijkstra".into();

    let (records, _) = reconcile_all(vec![e]);
    let record = &records[0];
    assert_eq!(record.method, Some(MatchMethod::CustomerName));
    assert_eq!(record.target_team, TargetTeam::NoActionInactive);
    assert_eq!(record.attempts.len(), 2);
}

#[test]
fn unmatched_rows_export_with_empty_crm_columns() {
    let mut e = event("EVT4");
    e.customers_name = " ".into();

    let (records, _) = reconcile_all(vec![e]);
    let record = &records[0];
    assert!(record.method.is_none());
    assert!(record.attempts.is_empty());
    assert_eq!(record.target_team, TargetTeam::PreInstallation);

    let row = record.output_fields();
    assert_eq!(row.len(), OUTPUT_HEADER.len());
    for (name, value) in OUTPUT_HEADER.iter().zip(&row) {
        if name.starts_with("crm_") {
            assert!(value.is_empty(), "{name} should be empty, got {value:?}");
        }
    }
    assert_eq!(row[OUTPUT_HEADER.len() - 2], "Pre-Installation");
}

// -------------------------------------------------------------------------
// Partition
// -------------------------------------------------------------------------

#[test]
fn partition_counts_add_up() {
    let mut events = Vec::new();
    for (i, (lead, description)) in [
        ("CRM1", "cancelled"),
        ("CRM2", "cancelled"),
        ("CRM2", "cancelled at your request"),
        ("CRM4", "failed"),
        ("", "failed"),
        ("ACC9", "bank account closed"),
    ]
    .into_iter()
    .enumerate()
    {
        let mut e = event(&format!("EV{i}"));
        e.customers_metadata_lead_id = lead.into();
        e.details_description = description.into();
        events.push(e);
    }

    let (records, s) = reconcile_all(events);
    assert_eq!(s.total_events, 6);
    assert_eq!(
        s.rows_for(Destination::PreTeam) + s.rows_for(Destination::PostTeam) + s.rows_for(Destination::Check),
        6
    );
    assert_eq!(s.rows_for(Destination::PreTeam), 2);
    assert_eq!(s.rows_for(Destination::PostTeam), 2);
    assert_eq!(s.rows_for(Destination::Check), 2);
    assert_eq!(s.matched_by(MatchMethod::LeadId), 5);
    assert_eq!(s.unmatched, 1);

    for record in &records {
        let expected = record.target_team.destination();
        match record.event.id.as_str() {
            "EV2" => assert_eq!(record.target_team, TargetTeam::NoActionAtOurRequest),
            "EV3" => assert_eq!(record.target_team, TargetTeam::NoActionInactive),
            _ => assert_ne!(expected, Destination::Check),
        }
    }
}
