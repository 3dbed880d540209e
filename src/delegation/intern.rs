//! The intern: answers one question strictly from the supplied context.

use std::sync::Arc;

use crate::ai::{format_intern_request, Message, ModelClient, INTERN_SYSTEM_PROMPT};

use super::DelegationError;

/// Reads the context on the boss's behalf.
///
/// Stateless across calls. The intern sees only the current question and the
/// context, never the user's question or earlier consultations.
#[derive(Clone)]
pub struct Intern {
    client: Arc<dyn ModelClient>,
}

impl std::fmt::Debug for Intern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intern").finish_non_exhaustive()
    }
}

impl Intern {
    #[must_use]
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Answer `question` from `context`, returning the model's text verbatim.
    ///
    /// # Errors
    ///
    /// Returns `DelegationError::InvalidInput` for a blank question or context
    /// (no model call is made) and `DelegationError::ModelUnavailable` when
    /// the model client fails. Nothing is retried here.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, DelegationError> {
        if question.trim().is_empty() {
            return Err(DelegationError::InvalidInput(
                "intern question must not be empty".to_string(),
            ));
        }
        if context.trim().is_empty() {
            return Err(DelegationError::InvalidInput(
                "context must not be empty".to_string(),
            ));
        }

        let history = [Message::user(format_intern_request(question, context))];
        let answer = self.client.generate(INTERN_SYSTEM_PROMPT, &history).await?;
        tracing::debug!(chars = answer.len(), "Intern answered");
        Ok(answer)
    }
}
