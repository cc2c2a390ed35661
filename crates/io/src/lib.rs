// Reference store, CSV ingestion and team exports

pub mod decode;
pub mod error;
pub mod export;
pub mod ingest;
pub mod store;

pub use error::IoError;
pub use export::{ExportPaths, ExportReport, Partitioner};
pub use ingest::{
    import_crm_accounts, import_elevate_accounts, import_mandate_events, IngestReport, SourceKind,
};
pub use store::{Store, StoreWriter, WriteOutcome};
