//! ID generation for saga attempts and other transient identifiers

use uuid::Uuid;

/// Generate a prefixed, time-ordered identifier
///
/// Uses UUIDv7 so identifiers sort by creation time.
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
}
