//! Question suites: JSON fixtures run through one boss.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delegation::{Boss, Termination};

/// Errors loading or writing suites.
#[derive(thiserror::Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read suite file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse suite file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One question with its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteQuestion {
    pub id: String,
    pub question: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
}

/// A named group of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<SuiteQuestion>,
}

/// Accepted fixture layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum SuiteFile {
    Bare(Vec<Suite>),
    Wrapped { test_sets: Vec<Suite> },
}

/// Parse suites from JSON text.
///
/// Accepts either a bare array of suites or an object with a `test_sets` array.
///
/// # Errors
///
/// Returns the `serde_json` error if the text matches neither layout.
pub fn parse_suites(json: &str) -> Result<Vec<Suite>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        SuiteFile::Bare(suites) => suites,
        SuiteFile::Wrapped { test_sets } => test_sets,
    })
}

/// Load suites from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_suites(path: &Path) -> Result<Vec<Suite>, SuiteError> {
    let content = std::fs::read_to_string(path).map_err(|source| SuiteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_suites(&content).map_err(|source| SuiteError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Outcome of one suite question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub id: String,
    pub question: String,
    pub resolution_id: Uuid,
    pub answer: Option<String>,
    pub expected_answer: Option<String>,
    pub terminated_by: Termination,
    pub iterations: usize,
    /// Exact match after trimming; `None` without an expected answer or on failure.
    pub matched: Option<bool>,
    pub error: Option<String>,
}

/// Results of one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteResult {
    pub name: String,
    pub description: String,
    pub results: Vec<QuestionResult>,
}

/// Totals across every suite that was run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub suites: Vec<SuiteResult>,
    pub total: usize,
    pub answered: usize,
    pub matched: usize,
    pub failed: usize,
}

impl SuiteReport {
    fn push(&mut self, suite: SuiteResult) {
        for result in &suite.results {
            self.total += 1;
            if result.error.is_some() {
                self.failed += 1;
            } else {
                self.answered += 1;
            }
            if result.matched == Some(true) {
                self.matched += 1;
            }
        }
        self.suites.push(suite);
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SuiteError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON rendering to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<(), SuiteError> {
        std::fs::write(path, self.to_json()?).map_err(|source| SuiteError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn answers_match(answer: &str, expected: &str) -> bool {
    answer.trim() == expected.trim()
}

/// Run every question sequentially at depth 0.
///
/// A failing question is reported and the run continues.
pub async fn run_suites(boss: &Boss, suites: &[Suite]) -> SuiteReport {
    let mut report = SuiteReport::default();

    for suite in suites {
        tracing::info!(suite = %suite.name, questions = suite.questions.len(), "Running suite");
        let mut results = Vec::with_capacity(suite.questions.len());

        for q in &suite.questions {
            let result = match boss.answer(&q.question, &q.context, 0).await {
                Ok(outcome) => QuestionResult {
                    id: q.id.clone(),
                    question: q.question.clone(),
                    resolution_id: outcome.resolution_id,
                    matched: q
                        .expected_answer
                        .as_deref()
                        .map(|expected| answers_match(&outcome.final_answer, expected)),
                    answer: Some(outcome.final_answer),
                    expected_answer: q.expected_answer.clone(),
                    terminated_by: outcome.terminated_by,
                    iterations: outcome.evidence.len(),
                    error: None,
                },
                Err(failure) => {
                    tracing::warn!(id = %q.id, error = %failure, "Suite question failed");
                    QuestionResult {
                        id: q.id.clone(),
                        question: q.question.clone(),
                        resolution_id: failure.resolution_id,
                        answer: None,
                        expected_answer: q.expected_answer.clone(),
                        terminated_by: failure.terminated_by(),
                        iterations: failure.evidence.len(),
                        matched: None,
                        error: Some(failure.to_string()),
                    }
                }
            };
            results.push(result);
        }

        report.push(SuiteResult {
            name: suite.name.clone(),
            description: suite.description.clone(),
            results,
        });
    }

    report
}
