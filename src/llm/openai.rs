//! OpenAI-compatible model service client
//!
//! Implements the ModelClient trait over a chat-completions style HTTP API,
//! with bounded retries for transient errors. Responses are parsed into the
//! typed contracts from `types`; unparseable payloads fall back to the
//! regex-based partial extraction instead of failing the turn.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::ModelClient;
use super::error::LlmError;
use super::types::{first_json_object, FieldMap, MultiEntryDetection, ParsedVerdict, RelevanceVerdict};
use crate::config::LlmConfig;
use crate::domain::{MessageIntent, ModificationRequest, ScheduledRecord};

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Model service client for OpenAI-compatible APIs
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::InvalidResponse(format!("{} not set", config.api_key_env)))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            timeout,
        })
    }

    /// Run one prompt against the chat endpoint, retrying transient failures
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0,
        });

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "Retrying model call");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(Duration::from_secs(5));
                last_error = Some(LlmError::RateLimited { retry_after });
                continue;
            }
            if !response.status().is_success() {
                let message = response.text().await.unwrap_or_default();
                let err = LlmError::Api { status, message };
                if is_retryable_status(status) {
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let parsed: ChatResponse = response.json().await?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| LlmError::InvalidResponse("empty completion".into()))?;
            debug!(len = content.len(), "Model response received");
            return Ok(content);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("retries exhausted".into())))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn extract_fields(&self, text: &str, reference: NaiveDateTime) -> Result<FieldMap, LlmError> {
        let system = format!(
            "Extract scheduling fields from the user message. Reference date: {}. \
             Reply with a single JSON object whose keys are any of: day, month, year, \
             hour, minute, location, surgeon, anesthesiologist, procedure, quantity, \
             notes. Values are strings. Omit unknown fields.",
            reference.format("%Y-%m-%d %H:%M")
        );
        let raw = self.complete(&system, text).await?;
        match first_json_object(&raw).and_then(|j| serde_json::from_str::<FieldMap>(j).ok()) {
            Some(map) => Ok(map),
            None => {
                warn!("Unparseable extraction response, using regex fallback");
                Ok(FieldMap::fallback_from_text(text, reference))
            }
        }
    }

    async fn classify_intent(&self, text: &str) -> Result<MessageIntent, LlmError> {
        let system = "Classify the scheduling intent of the message. Reply with exactly one \
                      word from: new, modify, cancel, query, report, help, unknown.";
        let raw = self.complete(system, text).await?;
        Ok(MessageIntent::from_label(&raw))
    }

    async fn detect_new_entry_start(&self, text: &str, context: &str) -> Result<bool, LlmError> {
        let system = format!(
            "The user is mid-task: {context}. Decide if this message instead starts an \
             unrelated new scheduling record. Reply with a JSON object: {{\"new_entry\": bool}}."
        );
        #[derive(Deserialize)]
        struct NewEntry {
            new_entry: bool,
        }
        let raw = self.complete(&system, text).await?;
        Ok(first_json_object(&raw)
            .and_then(|j| serde_json::from_str::<NewEntry>(j).ok())
            .map(|r| r.new_entry)
            .unwrap_or(false))
    }

    async fn detect_multiple_entries(&self, text: &str) -> Result<MultiEntryDetection, LlmError> {
        let system = "Detect whether the message enumerates multiple independent scheduled \
                      procedures (\"2 CERS y 1 HAVA\"). Reply with a JSON object: \
                      {\"multiple\": bool, \"entries\": [{\"quantity\": int, \"name\": str}], \
                      \"confidence\": float}.";
        let raw = self.complete(system, text).await?;
        first_json_object(&raw)
            .and_then(|j| serde_json::from_str::<MultiEntryDetection>(j).ok())
            .ok_or_else(|| LlmError::InvalidResponse(raw))
    }

    async fn analyze_context_relevance(&self, text: &str, context: &str) -> Result<ParsedVerdict, LlmError> {
        let system = format!(
            "Active conversation context: {context}. Judge whether the message continues \
             that task. Reply with a JSON object: {{\"relevant\": bool, \"confidence\": float, \
             \"reason\": str, \"context_switch\": bool}}."
        );
        let raw = self.complete(&system, text).await?;
        Ok(
            match first_json_object(&raw).and_then(|j| serde_json::from_str::<RelevanceVerdict>(j).ok()) {
                Some(v) => ParsedVerdict::Parsed(v),
                None => ParsedVerdict::Unparseable(raw),
            },
        )
    }

    async fn extract_modification(
        &self,
        original: &ScheduledRecord,
        text: &str,
    ) -> Result<ModificationRequest, LlmError> {
        let system = format!(
            "The user wants to modify this record:\n{}\nExtract ONLY the fields they ask to \
             change. Reply with a JSON object with any of: date (dd/mm/yyyy), time (HH:MM), \
             location, surgeon, anesthesiologist, procedure, quantity (int), notes. Omit \
             everything the user did not mention.",
            describe_record(original)
        );
        let raw = self.complete(&system, text).await?;
        Ok(parse_modification_response(&raw))
    }
}

fn describe_record(record: &ScheduledRecord) -> String {
    format!(
        "date: {}\nlocation: {}\nsurgeon: {}\nprocedure: {}\nquantity: {}\nanesthesiologist: {}",
        record
            .scheduled_at
            .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "unset".into()),
        record.location.as_deref().unwrap_or("unset"),
        record.surgeon.as_deref().unwrap_or("unset"),
        record.procedure.as_deref().unwrap_or("unset"),
        record.quantity.map(|q| q.to_string()).unwrap_or_else(|| "unset".into()),
        record.anesthesiologist.as_deref().unwrap_or("unset"),
    )
}

/// Parse a modification response, degrading to regex extraction of date and
/// time when the JSON is broken
fn parse_modification_response(raw: &str) -> ModificationRequest {
    #[derive(Deserialize)]
    struct Wire {
        date: Option<String>,
        time: Option<String>,
        location: Option<String>,
        surgeon: Option<String>,
        anesthesiologist: Option<String>,
        procedure: Option<String>,
        quantity: Option<u32>,
        notes: Option<String>,
    }

    if let Some(wire) = first_json_object(raw).and_then(|j| serde_json::from_str::<Wire>(j).ok()) {
        return ModificationRequest {
            new_date: wire.date.as_deref().and_then(|d| NaiveDate::parse_from_str(d, "%d/%m/%Y").ok()),
            new_time: wire.time.as_deref().and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok()),
            new_location: wire.location.filter(|s| !s.is_empty()),
            new_surgeon: wire.surgeon.filter(|s| !s.is_empty()),
            new_anesthesiologist: wire.anesthesiologist.filter(|s| !s.is_empty()),
            new_procedure: wire.procedure.filter(|s| !s.is_empty()),
            new_quantity: wire.quantity,
            new_notes: wire.notes.filter(|s| !s.is_empty()),
        };
    }

    warn!("Unparseable modification response, trying regex extraction");
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let time_re = TIME_RE.get_or_init(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());
    let date_re = DATE_RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})\b").unwrap());

    let mut modification = ModificationRequest::default();
    if let Some(cap) = time_re.captures(raw)
        && let Ok(t) = NaiveTime::parse_from_str(&cap[0], "%H:%M")
    {
        modification.new_time = Some(t);
    }
    if let Some(cap) = date_re.captures(raw)
        && let Ok(d) = NaiveDate::parse_from_str(&cap[0].replace('-', "/"), "%d/%m/%Y")
    {
        modification.new_date = Some(d);
    }
    modification
}
