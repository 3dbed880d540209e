//! Transcript event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delegation::{EvidenceLog, IterationRecord, Termination};

/// Kind of transcript event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// One boss to intern consultation.
    Exchange,
    /// The resolution produced an answer.
    Final,
    /// The resolution failed.
    Error,
}

impl EventKind {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::Final => "final",
            Self::Error => "error",
        }
    }

    /// Parse the database representation, defaulting to `Error`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "exchange" => Self::Exchange,
            "final" => Self::Final,
            _ => Self::Error,
        }
    }
}

/// A transcript event emitted by the boss loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// Resolution this event belongs to.
    pub resolution_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Evidence index for exchanges, consultation count otherwise.
    pub iteration: Option<usize>,
    /// Intern question (exchange) or user question (final, error).
    pub question: Option<String>,
    /// Intern answer (exchange) or final answer.
    pub answer: Option<String>,
    pub terminated_by: Option<Termination>,
    /// Error description.
    pub message: Option<String>,
    /// Evidence gathered before a failure.
    pub evidence: Option<EvidenceLog>,
}

impl TranscriptEvent {
    fn new(resolution_id: Uuid, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            resolution_id,
            timestamp: Utc::now(),
            kind,
            iteration: None,
            question: None,
            answer: None,
            terminated_by: None,
            message: None,
            evidence: None,
        }
    }

    /// Event for one consultation.
    #[must_use]
    pub fn exchange(resolution_id: Uuid, record: &IterationRecord) -> Self {
        Self {
            iteration: Some(record.index),
            question: Some(record.sub_question.clone()),
            answer: Some(record.sub_answer.clone()),
            ..Self::new(resolution_id, EventKind::Exchange)
        }
    }

    /// Event for a successful resolution.
    #[must_use]
    pub fn final_answer(
        resolution_id: Uuid,
        user_question: &str,
        answer: &str,
        terminated_by: Termination,
        iterations: usize,
    ) -> Self {
        Self {
            iteration: Some(iterations),
            question: Some(user_question.to_string()),
            answer: Some(answer.to_string()),
            terminated_by: Some(terminated_by),
            ..Self::new(resolution_id, EventKind::Final)
        }
    }

    /// Event for a failed resolution, carrying the partial evidence.
    #[must_use]
    pub fn error(
        resolution_id: Uuid,
        user_question: &str,
        message: impl Into<String>,
        evidence: &EvidenceLog,
    ) -> Self {
        Self {
            iteration: Some(evidence.len()),
            question: Some(user_question.to_string()),
            terminated_by: Some(Termination::Error),
            message: Some(message.into()),
            evidence: Some(evidence.clone()),
            ..Self::new(resolution_id, EventKind::Error)
        }
    }
}
