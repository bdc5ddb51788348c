//! agendacx: conversational scheduling assistant
//!
//! Turns free-text chat messages into structured scheduling records and
//! commits them atomically across a persistent store and an external
//! calendar. The interesting parts are the per-chat conversation state
//! machine, the context-relevance classifier that keeps mid-task replies on
//! rails, the compound-message splitter, and the commit saga with
//! compensation.

pub mod calendar;
pub mod channel;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod edit;
pub mod llm;
pub mod multi;
pub mod parse;
pub mod saga;
pub mod session;
pub mod store;
pub mod teams;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use domain::{ModificationRequest, ScheduledRecord};
pub use session::{SessionRegistry, TurnEngine};
