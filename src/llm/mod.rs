//! Model service adapter
//!
//! ModelClient trait, the OpenAI-compatible implementation, and the typed
//! result contracts for every classifier call.

pub mod client;
pub mod error;
pub mod openai;
pub mod types;

#[cfg(test)]
pub mod tests_support;

pub use client::ModelClient;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use types::{first_json_object, DetectedEntry, FieldMap, MultiEntryDetection, ParsedVerdict, RelevanceVerdict};
