//! Conversation state machine
//!
//! One session per chat, advanced one turn at a time while the chat's lock
//! is held. The engine orchestrates a full turn; the wizard owns the
//! field-by-field collection loop.

pub mod engine;
pub mod registry;
pub mod state;
pub mod wizard;

pub use engine::TurnEngine;
pub use registry::SessionRegistry;
pub use state::{ContextType, ConversationSession};
pub use wizard::FieldWizard;
