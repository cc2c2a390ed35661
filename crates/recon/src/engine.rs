use crate::classify::classify;
use crate::index::CrmLookup;
use crate::model::{MandateEvent, ResolvedRecord};
use crate::resolve::{resolve, Diagnostic};
use crate::summary::RunSummary;

/// Resolve one event and route it. Lookup diagnostics are returned alongside.
pub fn reconcile<L: CrmLookup>(event: MandateEvent, lookup: &L) -> (ResolvedRecord, Vec<Diagnostic>) {
    let resolution = resolve(&event, lookup);
    let target_team = classify(&resolution.profile.stage_name, &event.details_description);

    let record = ResolvedRecord {
        event,
        profile: resolution.profile,
        target_team,
        method: resolution.method,
        attempts: resolution.attempts,
    };
    (record, resolution.diagnostics)
}

/// Reconcile a batch of events one at a time against a fixed snapshot,
/// handing each record to `sink` in input order. The first sink error stops
/// the batch.
pub fn run<L, I, F, E>(events: I, lookup: &L, mut sink: F) -> Result<RunSummary, E>
where
    L: CrmLookup,
    I: IntoIterator<Item = MandateEvent>,
    F: FnMut(ResolvedRecord) -> Result<(), E>,
{
    let mut summary = RunSummary::default();
    for event in events {
        let (record, diagnostics) = reconcile(event, lookup);
        summary.record(&record, diagnostics.len());
        sink(record)?;
    }
    Ok(summary)
}
