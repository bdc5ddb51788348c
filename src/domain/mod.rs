//! Domain types
//!
//! The entities the conversation engine builds and commits: scheduling
//! records, sparse modification requests, batch metadata, and intents.

pub mod batch;
pub mod id;
pub mod intent;
pub mod modification;
pub mod record;

pub use batch::{BatchContext, BatchEntry};
pub use id::generate_id;
pub use intent::MessageIntent;
pub use modification::ModificationRequest;
pub use record::{PendingField, ScheduledRecord};
