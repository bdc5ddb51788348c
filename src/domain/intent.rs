//! Message intent classification result

use serde::{Deserialize, Serialize};

/// Global intent of an inbound message, as classified by the model service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageIntent {
    /// Start registering a new record
    NewRecord,
    /// Modify an existing record
    Modify,
    /// Cancel the current task or an existing record
    Cancel,
    /// Query existing records
    Query,
    /// Ask for a report
    Report,
    /// Ask for help
    Help,
    /// Could not be classified
    #[default]
    Unknown,
}

impl MessageIntent {
    /// Parse the label the classifier prompt is instructed to emit
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "new" | "new_record" | "register" => Self::NewRecord,
            "modify" | "edit" => Self::Modify,
            "cancel" => Self::Cancel,
            "query" | "search" => Self::Query,
            "report" => Self::Report,
            "help" => Self::Help,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for MessageIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewRecord => write!(f, "new_record"),
            Self::Modify => write!(f, "modify"),
            Self::Cancel => write!(f, "cancel"),
            Self::Query => write!(f, "query"),
            Self::Report => write!(f, "report"),
            Self::Help => write!(f, "help"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(MessageIntent::from_label("new"), MessageIntent::NewRecord);
        assert_eq!(MessageIntent::from_label("Modify"), MessageIntent::Modify);
        assert_eq!(MessageIntent::from_label("gibberish"), MessageIntent::Unknown);
    }
}
