//! Data carried through one resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One boss to intern consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based position in the evidence log.
    pub index: usize,
    /// Question the intern received.
    pub sub_question: String,
    /// Intern's answer, verbatim.
    pub sub_answer: String,
}

/// Ordered, append-only evidence for one question.
///
/// Later records refine or extend earlier ones, so insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceLog {
    records: Vec<IterationRecord>,
}

impl EvidenceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a consultation and return the stored record.
    pub fn push(
        &mut self,
        sub_question: impl Into<String>,
        sub_answer: impl Into<String>,
    ) -> &IterationRecord {
        let index = self.records.len() + 1;
        self.records.push(IterationRecord {
            index,
            sub_question: sub_question.into(),
            sub_answer: sub_answer.into(),
        });
        &self.records[index - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Question/answer pairs in insertion order.
    pub fn exchanges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records
            .iter()
            .map(|r| (r.sub_question.as_str(), r.sub_answer.as_str()))
    }

    /// Render as `Q:`/`A:` blocks separated by blank lines.
    #[must_use]
    pub fn render(&self) -> String {
        self.records
            .iter()
            .map(|r| format!("Q: {}\nA: {}", r.sub_question, r.sub_answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Termination {
    /// The boss emitted the completion sentinel.
    Satisfied,
    /// The iteration budget ran out and the answer was synthesized.
    MaxIterations,
    /// The resolution failed.
    Error,
}

impl Termination {
    /// Returns the string representation for storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfied => "SATISFIED",
            Self::MaxIterations => "MAX_ITERATIONS",
            Self::Error => "ERROR",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "SATISFIED" => Some(Self::Satisfied),
            "MAX_ITERATIONS" => Some(Self::MaxIterations),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question to resolve against a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<'a> {
    pub user_question: &'a str,
    pub context: &'a str,
    pub depth: usize,
}

/// Successful result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Identifier shared by every transcript event of this resolution.
    pub resolution_id: Uuid,
    pub final_answer: String,
    pub terminated_by: Termination,
    pub evidence: EvidenceLog,
}
