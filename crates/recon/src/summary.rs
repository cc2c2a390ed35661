use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::{Destination, TargetTeam};
use crate::model::ResolvedRecord;
use crate::resolve::MatchMethod;

/// Per-run tallies over resolved records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_events: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub by_method: BTreeMap<MatchMethod, usize>,
    pub by_team: BTreeMap<TargetTeam, usize>,
    pub by_destination: BTreeMap<Destination, usize>,
    pub diagnostics: usize,
}

impl RunSummary {
    pub fn record(&mut self, record: &ResolvedRecord, diagnostics: usize) {
        self.total_events += 1;
        match record.method {
            Some(method) => {
                self.matched += 1;
                *self.by_method.entry(method).or_insert(0) += 1;
            }
            None => self.unmatched += 1,
        }
        *self.by_team.entry(record.target_team).or_insert(0) += 1;
        *self.by_destination.entry(record.target_team.destination()).or_insert(0) += 1;
        self.diagnostics += diagnostics;
    }

    pub fn rows_for(&self, destination: Destination) -> usize {
        self.by_destination.get(&destination).copied().unwrap_or(0)
    }

    pub fn matched_by(&self, method: MatchMethod) -> usize {
        self.by_method.get(&method).copied().unwrap_or(0)
    }
}
