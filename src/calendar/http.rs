//! HTTP calendar client
//!
//! Talks to a REST calendar gateway. A 401 from the gateway means the user's
//! delegated authorization has lapsed, which the saga handles as a carve-out
//! rather than a rollback trigger.

use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CalendarError, CalendarService};
use crate::config::CalendarConfig;
use crate::domain::ScheduledRecord;

/// Calendar gateway client
pub struct HttpCalendarClient {
    base_url: String,
    api_key: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct CreateEventResponse {
    event_id: String,
}

#[derive(Debug, Deserialize)]
struct InviteResponse {
    accepted: bool,
}

impl HttpCalendarClient {
    pub fn from_config(config: &CalendarConfig) -> Result<Self, CalendarError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| CalendarError::InvalidResponse(format!("{} not set", config.api_key_env)))?;
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CalendarError::Network(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.clone(),
            api_key,
            http,
        })
    }

    fn check_auth(status: u16, message: String) -> CalendarError {
        if status == 401 {
            CalendarError::AuthExpired
        } else {
            CalendarError::Api { status, message }
        }
    }
}

#[async_trait]
impl CalendarService for HttpCalendarClient {
    async fn create_event(&self, record: &ScheduledRecord) -> Result<String, CalendarError> {
        let start = record
            .scheduled_at
            .ok_or_else(|| CalendarError::InvalidResponse("record has no schedule".into()))?;
        let title = match (&record.procedure, record.quantity) {
            (Some(p), Some(q)) if q > 1 => format!("{q}x {p}"),
            (Some(p), _) => p.clone(),
            (None, _) => "Agenda".to_string(),
        };
        let body = serde_json::json!({
            "title": title,
            "start": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "end": (start + Duration::hours(1)).format("%Y-%m-%dT%H:%M:%S").to_string(),
            "location": record.location,
            "description": record.summary_lines().join("\n"),
        });

        let response = self
            .http
            .post(format!("{}/events", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Self::check_auth(status, message));
        }

        let parsed: CreateEventResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;
        debug!(event_id = %parsed.event_id, "Calendar event created");
        Ok(parsed.event_id)
    }

    async fn invite(&self, event_id: &str, email: &str) -> Result<bool, CalendarError> {
        let response = self
            .http
            .post(format!("{}/events/{}/attendees", self.base_url, event_id))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Self::check_auth(status, message));
        }

        let parsed: InviteResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::InvalidResponse(e.to_string()))?;
        Ok(parsed.accepted)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(format!("{}/events/{}", self.base_url, event_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        // 404 means it is already gone, which is the state we wanted
        if !response.status().is_success() && status != 404 {
            let message = response.text().await.unwrap_or_default();
            return Err(Self::check_auth(status, message));
        }
        debug!(event_id, "Calendar event deleted");
        Ok(())
    }
}
