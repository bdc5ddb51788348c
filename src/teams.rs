//! Team and contact resolution seams

use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves which team owns a chat
#[async_trait]
pub trait TeamResolver: Send + Sync {
    async fn team_for_chat(&self, chat_id: i64) -> Option<i64>;
}

/// Resolves a collaborator's invite address by name
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn email_for(&self, name: &str) -> Option<String>;
}

/// Every chat belongs to one fixed team. Enough for single-tenant
/// deployments; multi-tenant setups plug in their own resolver.
pub struct FixedTeamResolver(pub i64);

#[async_trait]
impl TeamResolver for FixedTeamResolver {
    async fn team_for_chat(&self, _chat_id: i64) -> Option<i64> {
        Some(self.0)
    }
}

/// In-memory name-to-email directory, case-insensitive on names
#[derive(Default)]
pub struct MemoryDirectory {
    contacts: HashMap<String, String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, email: impl Into<String>) {
        self.contacts.insert(name.into().to_lowercase(), email.into());
    }
}

#[async_trait]
impl ContactDirectory for MemoryDirectory {
    async fn email_for(&self, name: &str) -> Option<String> {
        let lower = name.trim().to_lowercase();
        if let Some(email) = self.contacts.get(&lower) {
            return Some(email.clone());
        }
        // partial match: "Dra. García" should find "garcía"
        self.contacts
            .iter()
            .find(|(stored, _)| lower.contains(stored.as_str()) || stored.contains(&lower))
            .map(|(_, email)| email.clone())
    }
}
