//! Identity cascade linking a mandate event to a CRM account.
//!
//! Strategies run in [`CASCADE`] order and the first one that yields a CRM row
//! with an identity wins. A strategy whose trigger field is blank after
//! trimming is skipped and leaves no attempt behind. A lookup error counts as
//! no match for that strategy and is returned as a [`Diagnostic`].

use serde::Serialize;
use tracing::{debug, warn};

use crate::index::CrmLookup;
use crate::model::{CrmAccount, CrmProfile, MandateEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// `customers_metadata_leadID` against CRM id or account number.
    LeadId,
    /// `mandates_id` through the Elevate mandate reference to the CRM account number.
    MandateBridge,
    /// `customers_id` against the CRM GoCardless id.
    CustomerId,
    /// `customers_name` against the CRM display name.
    CustomerName,
}

/// Fixed priority order.
pub const CASCADE: [MatchMethod; 4] = [
    MatchMethod::LeadId,
    MatchMethod::MandateBridge,
    MatchMethod::CustomerId,
    MatchMethod::CustomerName,
];

impl MatchMethod {
    /// Event field this strategy keys on, untrimmed.
    pub fn trigger<'e>(&self, event: &'e MandateEvent) -> &'e str {
        match self {
            Self::LeadId => &event.customers_metadata_lead_id,
            Self::MandateBridge => &event.mandates_id,
            Self::CustomerId => &event.customers_id,
            Self::CustomerName => &event.customers_name,
        }
    }

    fn lookup<L: CrmLookup>(&self, lookup: &L, key: &str) -> Result<Vec<CrmAccount>, L::Error> {
        match self {
            Self::LeadId => lookup.by_id_or_account_number(key),
            Self::MandateBridge => lookup.by_bridged_mandate_reference(key),
            Self::CustomerId => lookup.by_processor_id(key),
            Self::CustomerName => lookup.by_exact_name(key),
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeadId => write!(f, "lead_id"),
            Self::MandateBridge => write!(f, "mandate_bridge"),
            Self::CustomerId => write!(f, "customer_id"),
            Self::CustomerName => write!(f, "customer_name"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Matched,
    NoMatch,
    Failed,
}

/// One strategy that was actually tried for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub method: MatchMethod,
    pub key: String,
    pub outcome: AttemptOutcome,
}

/// A lookup error surfaced from the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub event_id: String,
    pub method: MatchMethod,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event '{}': {} lookup failed: {}", self.event_id, self.method, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub profile: CrmProfile,
    pub method: Option<MatchMethod>,
    pub attempts: Vec<Attempt>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the cascade for one event.
pub fn resolve<L: CrmLookup>(event: &MandateEvent, lookup: &L) -> Resolution {
    let mut resolution = Resolution::default();

    for method in CASCADE {
        let key = method.trigger(event).trim();
        if key.is_empty() {
            continue;
        }

        let outcome = match method.lookup(lookup, key) {
            Ok(candidates) => match candidates.into_iter().find(CrmAccount::has_identity) {
                Some(account) => {
                    debug!(
                        event = %event.id, %method, key,
                        crm_id = %account.crm_id,
                        crm_account_number = %account.account_number,
                        "matched CRM record"
                    );
                    resolution.attempts.push(Attempt {
                        method,
                        key: key.to_string(),
                        outcome: AttemptOutcome::Matched,
                    });
                    resolution.profile = account.into();
                    resolution.method = Some(method);
                    return resolution;
                }
                None => {
                    debug!(event = %event.id, %method, key, "no CRM record");
                    AttemptOutcome::NoMatch
                }
            },
            Err(e) => {
                let diagnostic = Diagnostic {
                    event_id: event.id.clone(),
                    method,
                    message: e.to_string(),
                };
                warn!("{diagnostic}");
                resolution.diagnostics.push(diagnostic);
                AttemptOutcome::Failed
            }
        };

        resolution.attempts.push(Attempt { method, key: key.to_string(), outcome });
    }

    debug!(event = %event.id, "unmatched after {} attempt(s)", resolution.attempts.len());
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ReferenceIndex;
    use crate::model::ElevateAccount;
    use std::cell::RefCell;

    fn crm(id: &str, account: &str, name: &str, processor: &str, stage: &str) -> CrmAccount {
        CrmAccount {
            crm_id: id.into(),
            account_number: account.into(),
            name: name.into(),
            processor_id: processor.into(),
            stage_name: stage.into(),
            ..Default::default()
        }
    }

    fn event(lead: &str, mandate: &str, customer: &str, name: &str) -> MandateEvent {
        MandateEvent {
            id: "EV1".into(),
            customers_metadata_lead_id: lead.into(),
            mandates_id: mandate.into(),
            customers_id: customer.into(),
            customers_name: name.into(),
            ..Default::default()
        }
    }

    fn methods(r: &Resolution) -> Vec<MatchMethod> {
        r.attempts.iter().map(|a| a.method).collect()
    }

    #[test]
    fn lead_id_beats_name() {
        let index = ReferenceIndex::build(
            vec![
                crm("CRM_NAME", "ACC_NAME", "Ada Lovelace", "", "ACTIVE"),
                crm("CRM_LEAD", "ACC_LEAD", "Someone Else", "", "SOLD"),
            ],
            vec![],
        );
        let r = resolve(&event("CRM_LEAD", "", "", "Ada Lovelace"), &index);
        assert_eq!(r.method, Some(MatchMethod::LeadId));
        assert_eq!(r.profile.crm_id, "CRM_LEAD");
        assert_eq!(methods(&r), vec![MatchMethod::LeadId]);
    }

    #[test]
    fn lead_id_matches_account_number() {
        let index = ReferenceIndex::build(vec![crm("CRM1", "ACC1", "", "", "")], vec![]);
        let r = resolve(&event("  ACC1 ", "", "", ""), &index);
        assert_eq!(r.method, Some(MatchMethod::LeadId));
        assert_eq!(r.attempts[0].key, "ACC1");
    }

    #[test]
    fn mandate_bridge_through_elevate() {
        let index = ReferenceIndex::build(
            vec![crm("CRM9", "ACC9", "", "", "PROVISIONING")],
            vec![ElevateAccount {
                account_number: "ACC9".into(),
                mandate_reference: "M100".into(),
                customer_name: "Grace Hopper".into(),
            }],
        );
        let r = resolve(&event("", " M100", "", ""), &index);
        assert_eq!(r.method, Some(MatchMethod::MandateBridge));
        assert_eq!(r.profile.crm_id, "CRM9");
        assert_eq!(r.profile.stage_name, "PROVISIONING");
    }

    #[test]
    fn falls_through_to_customer_id_then_name() {
        let index = ReferenceIndex::build(
            vec![crm("CRM3", "ACC3", "", "CU3", ""), crm("CRM4", "ACC4", "Ada Lovelace", "", "")],
            vec![],
        );
        let r = resolve(&event("NOPE", "M0", "CU3", "Ada Lovelace"), &index);
        assert_eq!(r.method, Some(MatchMethod::CustomerId));
        assert_eq!(
            methods(&r),
            vec![MatchMethod::LeadId, MatchMethod::MandateBridge, MatchMethod::CustomerId]
        );

        let r = resolve(&event("", "", "CU_NONE", " Ada Lovelace "), &index);
        assert_eq!(r.method, Some(MatchMethod::CustomerName));
        assert_eq!(r.profile.crm_id, "CRM4");
    }

    #[test]
    fn empty_trigger_is_skipped_not_attempted() {
        // A CRM row with an empty id would match an empty lead id if it were looked up.
        let index = ReferenceIndex::build(vec![crm("", "ACC_EMPTY_ID", "", "", "ACTIVE")], vec![]);
        let r = resolve(&event("   ", "", "", ""), &index);
        assert!(r.method.is_none());
        assert!(r.attempts.is_empty());
        assert!(r.profile.is_empty());
    }

    #[test]
    fn identity_less_rows_are_discarded() {
        let index = ReferenceIndex::build(
            vec![crm("", "", "Ada Lovelace", "", "ACTIVE"), crm("CRM2", "", "Ada Lovelace", "", "SOLD")],
            vec![],
        );
        let r = resolve(&event("", "", "", "Ada Lovelace"), &index);
        assert_eq!(r.profile.crm_id, "CRM2");
        assert_eq!(r.profile.stage_name, "SOLD");

        let index = ReferenceIndex::build(vec![crm("", "", "Ada Lovelace", "CU1", "ACTIVE")], vec![]);
        let r = resolve(&event("", "", "CU1", "Ada Lovelace"), &index);
        assert!(r.method.is_none());
        assert_eq!(r.attempts.len(), 2);
        assert!(r.attempts.iter().all(|a| a.outcome == AttemptOutcome::NoMatch));
    }

    #[test]
    fn first_candidate_wins_on_ambiguous_lead_id() {
        let index = ReferenceIndex::build(
            vec![crm("K1", "SHARED", "", "", "SOLD"), crm("SHARED", "ACC2", "", "", "ACTIVE")],
            vec![],
        );
        let r = resolve(&event("SHARED", "", "", ""), &index);
        assert_eq!(r.profile.crm_id, "K1");
    }

    /// Lookup that fails for one strategy and records every call.
    struct Flaky {
        inner: ReferenceIndex,
        calls: RefCell<Vec<MatchMethod>>,
    }

    impl CrmLookup for Flaky {
        type Error = String;

        fn by_id_or_account_number(&self, _key: &str) -> Result<Vec<CrmAccount>, String> {
            self.calls.borrow_mut().push(MatchMethod::LeadId);
            Err("database is locked".into())
        }

        fn by_bridged_mandate_reference(&self, key: &str) -> Result<Vec<CrmAccount>, String> {
            self.calls.borrow_mut().push(MatchMethod::MandateBridge);
            Ok(self.inner.by_bridged_mandate_reference(key).unwrap_or_default())
        }

        fn by_processor_id(&self, key: &str) -> Result<Vec<CrmAccount>, String> {
            self.calls.borrow_mut().push(MatchMethod::CustomerId);
            Ok(self.inner.by_processor_id(key).unwrap_or_default())
        }

        fn by_exact_name(&self, key: &str) -> Result<Vec<CrmAccount>, String> {
            self.calls.borrow_mut().push(MatchMethod::CustomerName);
            Ok(self.inner.by_exact_name(key).unwrap_or_default())
        }
    }

    #[test]
    fn lookup_error_is_a_diagnostic_and_cascade_continues() {
        let lookup = Flaky {
            inner: ReferenceIndex::build(vec![crm("CRM3", "ACC3", "", "CU3", "")], vec![]),
            calls: RefCell::new(Vec::new()),
        };
        let r = resolve(&event("LEAD", "", "CU3", "Ada Lovelace"), &lookup);
        assert_eq!(r.method, Some(MatchMethod::CustomerId));
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].method, MatchMethod::LeadId);
        assert!(r.diagnostics[0].to_string().contains("database is locked"));
        assert_eq!(r.attempts[0].outcome, AttemptOutcome::Failed);
        // name strategy is never consulted once customer id matched
        assert_eq!(*lookup.calls.borrow(), vec![MatchMethod::LeadId, MatchMethod::CustomerId]);
    }
}
