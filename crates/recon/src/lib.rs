//! `mandates-recon` reconciles mandate lifecycle events against CRM and
//! billing reference data and routes each event to an operational team.
//!
//! Pure engine crate: receives reference rows and events, returns resolved
//! records. No file or database IO.

pub mod classify;
pub mod engine;
pub mod index;
pub mod model;
pub mod resolve;
pub mod summary;

pub use classify::{classify, Destination, TargetTeam};
pub use engine::{reconcile, run};
pub use index::{CrmLookup, ReferenceIndex};
pub use model::{CrmAccount, CrmProfile, ElevateAccount, MandateEvent, ResolvedRecord, DATE_FORMAT, OUTPUT_HEADER};
pub use resolve::{resolve, Diagnostic, MatchMethod, Resolution};
pub use summary::RunSummary;
