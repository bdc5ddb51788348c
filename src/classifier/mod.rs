//! Context-relevance classifier
//!
//! Decides whether an incoming message continues the active task, deviates
//! from it, or explicitly switches to another one. Keyword detection runs
//! before any model call so commands like "cancelar" never depend on the
//! model service being up.

use tracing::{debug, warn};

use crate::channel::{Button, Keyboard};
use crate::llm::{ModelClient, ParsedVerdict};
use crate::session::ContextType;

/// Task a switch keyword jumps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    NewTask,
    Cancel,
    Modify,
    Report,
}

const NEW_WORDS: &[&str] = &["nuevo", "nueva", "empezar", "comenzar", "iniciar", "start", "restart", "reiniciar"];
const CANCEL_WORDS: &[&str] = &["cancelar", "cancel", "parar", "stop", "salir", "exit", "abandonar"];
const MODIFY_WORDS: &[&str] = &["modificar", "cambiar", "editar", "update", "modify", "corregir"];
const REPORT_WORDS: &[&str] = &["reporte", "report", "informe", "consulta", "buscar", "ver"];

/// Everyday vocabulary that never belongs to a scheduling message
const OFF_DOMAIN_WORDS: &[&str] = &[
    "perro", "gato", "auto", "casa", "verde", "azul", "rojo", "mesa", "silla", "comida", "agua", "libro",
    "película", "música", "fútbol", "parque", "playa",
];

/// Classifier verdict for one message against the active context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRelevance {
    pub is_relevant: bool,
    pub confidence: f64,
    /// The user explicitly asked to switch tasks
    pub is_explicit_switch: bool,
    pub reason: String,
}

impl ContextRelevance {
    fn switch(reason: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            confidence: 0.95,
            is_explicit_switch: true,
            reason: reason.into(),
        }
    }

    fn relevant(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            is_relevant: true,
            confidence,
            is_explicit_switch: false,
            reason: reason.into(),
        }
    }

    fn irrelevant(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            confidence,
            is_explicit_switch: false,
            reason: reason.into(),
        }
    }

    /// Deviation: off-topic but not an explicit switch. The turn halts and
    /// the user picks continue or start-new.
    pub fn is_deviation(&self) -> bool {
        !self.is_relevant && !self.is_explicit_switch
    }
}

/// Classifies messages against the active conversation context
pub struct ContextClassifier;

impl ContextClassifier {
    /// Keyword-only check, independent of any model call. Matches whole
    /// tokens so "ver" does not fire inside "verde".
    pub fn explicit_switch_keyword(text: &str) -> Option<&'static str> {
        Self::switch_kind(text).map(|(kw, _)| kw)
    }

    /// Switch keyword and the task it jumps to, if the text carries one
    pub fn switch_kind(text: &str) -> Option<(&'static str, SwitchKind)> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        for (words, kind) in [
            (CANCEL_WORDS, SwitchKind::Cancel),
            (MODIFY_WORDS, SwitchKind::Modify),
            (REPORT_WORDS, SwitchKind::Report),
            (NEW_WORDS, SwitchKind::NewTask),
        ] {
            if let Some(kw) = words.iter().find(|kw| tokens.contains(kw)) {
                return Some((kw, kind));
            }
        }
        None
    }

    fn heuristic(text: &str) -> ContextRelevance {
        let trimmed = text.trim();
        if trimmed.chars().count() < 3 {
            return ContextRelevance::irrelevant(0.7, "mensaje demasiado corto");
        }
        let lower = trimmed.to_lowercase();
        if OFF_DOMAIN_WORDS.iter().any(|w| lower.contains(w)) {
            return ContextRelevance::irrelevant(0.8, "vocabulario fuera de dominio");
        }
        ContextRelevance::relevant(0.6, "sin señales de desvío")
    }

    /// Whether intent classification is skipped for this context. Mid-wizard
    /// and mid-confirmation replies are answers to our own prompts.
    pub fn should_bypass_intent(context: ContextType) -> bool {
        matches!(context, ContextType::FieldWizard | ContextType::Confirming)
    }

    /// Classify one message. Checks run in a fixed order and short-circuit:
    /// switch keywords, empty context, new-entry detection, model relevance,
    /// heuristics. Wizard and confirmation replies skip the last two: they
    /// answer our own prompts and must not depend on the relevance service.
    pub async fn classify(
        model: &dyn ModelClient,
        text: &str,
        context: ContextType,
        context_summary: &str,
    ) -> ContextRelevance {
        if let Some(kw) = Self::explicit_switch_keyword(text) {
            debug!(keyword = kw, "Explicit switch keyword");
            return ContextRelevance::switch(format!("palabra de cambio: {kw}"));
        }

        if context == ContextType::None {
            return ContextRelevance::relevant(1.0, "sin contexto activo");
        }

        match model.detect_new_entry_start(text, context_summary).await {
            Ok(true) => {
                debug!("Message starts an unrelated new record");
                return ContextRelevance::switch("inicio de registro nuevo");
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "New-entry detection failed"),
        }

        if Self::should_bypass_intent(context) {
            return ContextRelevance::relevant(0.9, "respuesta a una pregunta del asistente");
        }

        match model.analyze_context_relevance(text, context_summary).await {
            Ok(ParsedVerdict::Parsed(v)) => ContextRelevance {
                is_relevant: v.relevant,
                confidence: v.confidence,
                is_explicit_switch: v.context_switch,
                reason: v.reason,
            },
            Ok(ParsedVerdict::Unparseable(raw)) => {
                warn!(raw_len = raw.len(), "Unparseable relevance verdict, using heuristics");
                Self::heuristic(text)
            }
            Err(e) => {
                warn!(error = %e, "Relevance call failed, using heuristics");
                Self::heuristic(text)
            }
        }
    }

    /// Prompt shown when a deviation halts the turn
    pub fn deviation_prompt(text: &str) -> (String, Keyboard) {
        let message = format!(
            "Recibí: \"{text}\"\n\nEstamos en medio de un registro. ¿Querés continuar con el registro actual o empezar algo nuevo?"
        );
        let keyboard = Keyboard::single_row(vec![
            Button::new("Continuar registro", "deviation:continue"),
            Button::new("Empezar nuevo", "deviation:new"),
        ]);
        (message, keyboard)
    }
}
