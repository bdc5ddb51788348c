//! Edit flow: search, diff, confirm, patch
//!
//! Free-text modification of committed records. Search narrows to one
//! candidate, the model derives a sparse patch, the user confirms, the
//! store applies it. Calendar re-sync is best effort and never blocks the
//! reply.

pub mod orchestrator;
pub mod search;

pub use orchestrator::EditOrchestrator;
pub use search::{RecordSearch, SearchOutcome};
