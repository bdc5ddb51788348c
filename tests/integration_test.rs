//! End-to-end conversation flows over mocked external services

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use agendacx::calendar::{CalendarError, CalendarService};
use agendacx::channel::{ChannelError, ChannelSender, Keyboard};
use agendacx::domain::{MessageIntent, ModificationRequest, ScheduledRecord};
use agendacx::llm::types::{DetectedEntry, FieldMap, MultiEntryDetection, ParsedVerdict, RelevanceVerdict};
use agendacx::llm::{LlmError, ModelClient};
use agendacx::session::{ContextType, ConversationSession, TurnEngine};
use agendacx::store::{MemoryStore, RecordStore};
use agendacx::teams::{FixedTeamResolver, MemoryDirectory};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 8, 13).unwrap().and_hms_opt(10, 0, 0).unwrap()
}

/// Scripted model: field maps are keyed by input substring so batch inputs
/// resolve independently
#[derive(Default)]
struct ScriptedModel {
    field_maps: Vec<(String, Vec<(String, String)>)>,
    multi: Option<MultiEntryDetection>,
    modification: Option<ModificationRequest>,
}

impl ScriptedModel {
    fn map_for(&self, text: &str) -> FieldMap {
        for (needle, pairs) in &self.field_maps {
            if text.contains(needle.as_str()) {
                return FieldMap(pairs.iter().cloned().collect());
            }
        }
        FieldMap::default()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn extract_fields(&self, text: &str, _reference: NaiveDateTime) -> Result<FieldMap, LlmError> {
        Ok(self.map_for(text))
    }

    async fn classify_intent(&self, _text: &str) -> Result<MessageIntent, LlmError> {
        Ok(MessageIntent::Unknown)
    }

    async fn detect_new_entry_start(&self, _text: &str, _context: &str) -> Result<bool, LlmError> {
        Ok(false)
    }

    async fn detect_multiple_entries(&self, _text: &str) -> Result<MultiEntryDetection, LlmError> {
        Ok(self.multi.clone().unwrap_or_default())
    }

    async fn analyze_context_relevance(&self, _text: &str, _context: &str) -> Result<ParsedVerdict, LlmError> {
        Ok(ParsedVerdict::Parsed(RelevanceVerdict {
            relevant: true,
            confidence: 0.9,
            reason: "scripted".into(),
            context_switch: false,
        }))
    }

    async fn extract_modification(
        &self,
        _original: &ScheduledRecord,
        _text: &str,
    ) -> Result<ModificationRequest, LlmError> {
        Ok(self.modification.clone().unwrap_or_default())
    }
}

/// Calendar with injectable create failure
struct TestCalendar {
    create_error: Mutex<Option<CalendarError>>,
    next_id: Mutex<u32>,
    deleted: Mutex<Vec<String>>,
}

impl TestCalendar {
    fn ok() -> Self {
        Self {
            create_error: Mutex::new(None),
            next_id: Mutex::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: CalendarError) -> Self {
        Self {
            create_error: Mutex::new(Some(error)),
            ..Self::ok()
        }
    }
}

#[async_trait]
impl CalendarService for TestCalendar {
    async fn create_event(&self, _record: &ScheduledRecord) -> Result<String, CalendarError> {
        if let Some(e) = self.create_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut n = self.next_id.lock().unwrap();
        *n += 1;
        Ok(format!("evt-{n}"))
    }

    async fn invite(&self, _event_id: &str, _email: &str) -> Result<bool, CalendarError> {
        Ok(true)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

struct CollectingSender {
    messages: Mutex<Vec<String>>,
}

impl CollectingSender {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    fn all(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn last(&self) -> String {
        self.all().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChannelSender for CollectingSender {
    async fn send(&self, _chat_id: i64, text: &str, _keyboard: Option<Keyboard>) -> Result<(), ChannelError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn full_fields() -> Vec<(String, String)> {
    [
        ("day", "14"),
        ("month", "8"),
        ("year", "2026"),
        ("hour", "14"),
        ("procedure", "CERS"),
        ("surgeon", "Pérez"),
        ("location", "Hospital Italiano"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn build_engine(
    model: ScriptedModel,
    store: Arc<MemoryStore>,
    calendar: Arc<TestCalendar>,
    sender: Arc<CollectingSender>,
) -> TurnEngine {
    TurnEngine::new(
        Arc::new(model),
        store,
        calendar,
        sender,
        Arc::new(FixedTeamResolver(7)),
        Arc::new(MemoryDirectory::new()),
    )
}

#[tokio::test]
async fn confirmed_record_is_persisted_and_linked() {
    let model = ScriptedModel {
        field_maps: vec![("CERS".into(), full_fields())],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let calendar = Arc::new(TestCalendar::ok());
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), calendar, sender.clone());
    let mut session = ConversationSession::new(1);

    engine
        .handle_message(&mut session, "mañana 14hs CERS con Pérez en el Italiano", now())
        .await
        .unwrap();
    assert_eq!(session.context, ContextType::Confirming);

    engine.handle_message(&mut session, "sí", now()).await.unwrap();

    let stored = store.get(1).await.unwrap().unwrap();
    assert_eq!(stored.calendar_event_id.as_deref(), Some("evt-1"));
    assert!(stored.synced_at.is_some());
    assert!(session.is_idle());
}

#[tokio::test]
async fn calendar_failure_leaves_nothing_behind() {
    let model = ScriptedModel {
        field_maps: vec![("CERS".into(), full_fields())],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let calendar = Arc::new(TestCalendar::failing(CalendarError::Network("down".into())));
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), calendar, sender.clone());
    let mut session = ConversationSession::new(1);

    engine.handle_message(&mut session, "mañana 14hs CERS con Pérez", now()).await.unwrap();
    engine.handle_message(&mut session, "sí", now()).await.unwrap();

    // record was compensated away, user was told, retry stays possible
    assert!(store.is_empty());
    assert!(sender.last().contains("No pude agendar"));
    assert_eq!(session.context, ContextType::Confirming);
}

#[tokio::test]
async fn auth_expiry_keeps_record_unlinked() {
    let model = ScriptedModel {
        field_maps: vec![("CERS".into(), full_fields())],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let calendar = Arc::new(TestCalendar::failing(CalendarError::AuthExpired));
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), calendar, sender.clone());
    let mut session = ConversationSession::new(1);

    engine.handle_message(&mut session, "mañana 14hs CERS con Pérez", now()).await.unwrap();
    engine.handle_message(&mut session, "sí", now()).await.unwrap();

    let stored = store.get(1).await.unwrap().unwrap();
    assert!(stored.calendar_event_id.is_none());
    assert!(sender.last().contains("autorización"));
    assert!(session.is_idle());
}

#[tokio::test]
async fn compound_message_creates_batch_with_combined_confirmation() {
    let model = ScriptedModel {
        field_maps: vec![
            // both synthetic inputs share the residual context
            (
                "CERS".into(),
                [
                    ("day", "14"),
                    ("month", "8"),
                    ("year", "2026"),
                    ("hour", "14"),
                    ("procedure", "CERS"),
                    ("surgeon", "Pérez"),
                    ("location", "Italiano"),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ),
            (
                "HAVA".into(),
                [
                    ("day", "14"),
                    ("month", "8"),
                    ("year", "2026"),
                    ("hour", "14"),
                    ("procedure", "HAVA"),
                    ("surgeon", "Pérez"),
                    ("location", "Italiano"),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ),
        ],
        multi: Some(MultiEntryDetection {
            is_multiple: true,
            entries: vec![
                DetectedEntry {
                    quantity: 2,
                    name: "CERS".into(),
                },
                DetectedEntry {
                    quantity: 1,
                    name: "HAVA".into(),
                },
            ],
            confidence: 0.9,
        }),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let calendar = Arc::new(TestCalendar::ok());
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), calendar, sender.clone());
    let mut session = ConversationSession::new(1);

    engine
        .handle_message(&mut session, "2 CERS y 1 HAVA mañana 14hs con Pérez en el Italiano", now())
        .await
        .unwrap();

    assert_eq!(session.context, ContextType::Confirming);
    assert_eq!(session.batch_records.len(), 2);
    assert_eq!(session.batch_records[0].quantity, Some(2));
    assert_eq!(session.batch_records[1].quantity, Some(1));
    assert!(sender.last().contains("2 registros"));

    engine.handle_message(&mut session, "sí", now()).await.unwrap();
    assert_eq!(store.len(), 2);
    assert!(session.is_idle());
}

#[tokio::test]
async fn batch_rejection_accepts_per_entry_corrections() {
    let model = ScriptedModel {
        field_maps: vec![
            ("CERS".into(), full_fields()),
            (
                "HAVA".into(),
                [
                    ("day", "14"),
                    ("month", "8"),
                    ("year", "2026"),
                    ("hour", "14"),
                    ("procedure", "HAVA"),
                    ("surgeon", "Pérez"),
                    ("location", "Hospital Italiano"),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ),
        ],
        multi: Some(MultiEntryDetection {
            is_multiple: true,
            entries: vec![
                DetectedEntry {
                    quantity: 2,
                    name: "CERS".into(),
                },
                DetectedEntry {
                    quantity: 1,
                    name: "HAVA".into(),
                },
            ],
            confidence: 0.9,
        }),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), Arc::new(TestCalendar::ok()), sender.clone());
    let mut session = ConversationSession::new(1);

    engine
        .handle_message(&mut session, "2 CERS y 1 HAVA mañana 14hs con Pérez en el Italiano", now())
        .await
        .unwrap();
    engine.handle_message(&mut session, "no", now()).await.unwrap();
    assert!(sender.last().contains("qué corregir"));

    engine.handle_message(&mut session, "hava lugar Anchorena", now()).await.unwrap();
    assert_eq!(session.batch_records[1].location.as_deref(), Some("Anchorena"));
    // the other entry keeps its location
    assert_eq!(session.batch_records[0].location.as_deref(), Some("Hospital Italiano"));
}

#[tokio::test]
async fn edit_flow_applies_sparse_patch() {
    let store = Arc::new(MemoryStore::new());
    let mut rec = ScheduledRecord::new(1);
    rec.team_id = Some(7);
    rec.scheduled_at = NaiveDate::from_ymd_opt(2026, 9, 23).unwrap().and_hms_opt(14, 0, 0);
    rec.surgeon = Some("Pérez".into());
    rec.procedure = Some("CERS".into());
    rec.location = Some("Italiano".into());
    rec.quantity = Some(1);
    let id = store.create(&rec).await.unwrap();

    let model = ScriptedModel {
        modification: Some(ModificationRequest {
            new_time: chrono::NaiveTime::from_hms_opt(16, 0, 0),
            ..Default::default()
        }),
        ..Default::default()
    };
    let sender = CollectingSender::new();
    let engine = build_engine(model, store.clone(), Arc::new(TestCalendar::ok()), sender.clone());
    let mut session = ConversationSession::new(1);

    engine
        .handle_message(&mut session, "cambiar la cers de pérez a las 16hs", now())
        .await
        .unwrap();
    assert!(sender.last().contains("16:00"));
    assert!(session.pending_modification.is_some());

    engine.handle_message(&mut session, "sí", now()).await.unwrap();
    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.scheduled_at.unwrap().format("%d/%m %H:%M").to_string(), "23/09 16:00");
    // only the time moved
    assert_eq!(stored.surgeon.as_deref(), Some("Pérez"));
    assert_eq!(stored.location.as_deref(), Some("Italiano"));
}

#[tokio::test]
async fn cancel_keyword_wins_in_any_state() {
    let model = ScriptedModel {
        field_maps: vec![("CERS".into(), vec![("procedure".to_string(), "CERS".to_string())])],
        ..Default::default()
    };
    let sender = CollectingSender::new();
    let engine = build_engine(model, Arc::new(MemoryStore::new()), Arc::new(TestCalendar::ok()), sender.clone());
    let mut session = ConversationSession::new(1);

    engine.handle_message(&mut session, "una CERS", now()).await.unwrap();
    assert_eq!(session.context, ContextType::FieldWizard);

    engine.handle_message(&mut session, "mejor cancelar", now()).await.unwrap();
    assert!(session.is_idle());
    assert!(session.record.is_none());
}

#[tokio::test]
async fn concurrent_chats_do_not_interfere() {
    let model = ScriptedModel {
        field_maps: vec![("CERS".into(), full_fields())],
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let sender = CollectingSender::new();
    let engine = Arc::new(build_engine(model, store.clone(), Arc::new(TestCalendar::ok()), sender.clone()));

    let mut session_a = ConversationSession::new(1);
    let mut session_b = ConversationSession::new(2);

    let (ra, rb) = tokio::join!(
        engine.handle_message(&mut session_a, "mañana 14hs CERS con Pérez", now()),
        engine.handle_message(&mut session_b, "perro verde", now()),
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(session_a.context, ContextType::Confirming);
    assert!(session_b.is_idle());
}
