//! The boss: iterative question formulation, termination and synthesis.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ai::{
    boss_turns, format_synthesis_request, is_ranking_question, with_qualifier_hint, Message,
    ModelClient, BOSS_SYSTEM_PROMPT, SYNTHESIS_SYSTEM_PROMPT,
};
use crate::config::DelegationConfig;
use crate::transcript::{NullSink, TranscriptEvent, TranscriptSink};

use super::{
    BossReply, DelegationError, EvidenceLog, Intern, Query, ResolutionFailure, ResolutionOutcome,
    ResolutionState, ResolutionStateMachine, Termination,
};

/// Effective settings of a boss, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BossSummary {
    pub boss_model: String,
    pub intern_model: String,
    pub max_iterations: usize,
    pub max_depth: usize,
    pub qualifier_hints: bool,
}

impl From<&DelegationConfig> for BossSummary {
    fn from(config: &DelegationConfig) -> Self {
        Self {
            boss_model: config.boss_model.clone(),
            intern_model: config.intern_model.clone(),
            max_iterations: config.max_iterations,
            max_depth: config.max_depth,
            qualifier_hints: config.qualifier_hints,
        }
    }
}

/// Drives the boss/intern loop for one question at a time.
///
/// A `Boss` holds no per-question state: every call to [`Boss::answer`] owns
/// its own evidence log and counters, so one instance can serve concurrent
/// questions when its collaborators allow it.
pub struct Boss {
    config: DelegationConfig,
    client: Arc<dyn ModelClient>,
    intern: Intern,
    sink: Arc<dyn TranscriptSink>,
}

impl std::fmt::Debug for Boss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boss")
            .field("config", &self.config)
            .field("intern", &self.intern)
            .finish_non_exhaustive()
    }
}

impl Boss {
    /// Create a boss that records nothing.
    ///
    /// # Errors
    ///
    /// Returns `DelegationError::InvalidInput` if `max_iterations` is 0.
    pub fn new(
        config: &DelegationConfig,
        client: Arc<dyn ModelClient>,
        intern: Intern,
    ) -> Result<Self, DelegationError> {
        if config.max_iterations == 0 {
            return Err(DelegationError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            config: config.clone(),
            client,
            intern,
            sink: Arc::new(NullSink),
        })
    }

    /// Record transcript events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn describe(&self) -> BossSummary {
        BossSummary::from(&self.config)
    }

    /// Reject a nesting level above the configured maximum.
    ///
    /// A nested resolution runs the same check at its own level.
    ///
    /// # Errors
    ///
    /// Returns `DelegationError::RecursionLimit` if `depth > max_depth`.
    pub fn check_depth(&self, depth: usize) -> Result<(), DelegationError> {
        if depth > self.config.max_depth {
            return Err(DelegationError::RecursionLimit {
                depth,
                max_depth: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// Answer `user_question` from `context` at nesting level `depth`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionFailure`] carrying the evidence gathered so far
    /// when validation, a model call, or boss output parsing fails.
    pub async fn answer(
        &self,
        user_question: &str,
        context: &str,
        depth: usize,
    ) -> Result<ResolutionOutcome, ResolutionFailure> {
        self.resolve(&Query {
            user_question,
            context,
            depth,
        })
        .await
    }

    /// Resolve a [`Query`]. See [`Boss::answer`].
    ///
    /// # Errors
    ///
    /// Same as [`Boss::answer`].
    pub async fn resolve(&self, query: &Query<'_>) -> Result<ResolutionOutcome, ResolutionFailure> {
        let resolution_id = Uuid::new_v4();
        let mut evidence = EvidenceLog::new();
        let mut machine = ResolutionStateMachine::new();

        info!(
            %resolution_id,
            depth = query.depth,
            max_iterations = self.config.max_iterations,
            model = %self.config.boss_model,
            "Resolution started"
        );

        match self
            .run(resolution_id, query, &mut evidence, &mut machine)
            .await
        {
            Ok((final_answer, terminated_by)) => {
                machine.transition(ResolutionState::Done);
                let stats = machine.stats();
                info!(
                    %resolution_id,
                    %terminated_by,
                    iteration = evidence.len(),
                    boss_calls = stats.boss_calls,
                    intern_calls = stats.intern_calls,
                    "Resolution finished"
                );
                self.record(&TranscriptEvent::final_answer(
                    resolution_id,
                    query.user_question,
                    &final_answer,
                    terminated_by,
                    evidence.len(),
                ))
                .await;
                Ok(ResolutionOutcome {
                    resolution_id,
                    final_answer,
                    terminated_by,
                    evidence,
                })
            }
            Err(err) => {
                machine.transition(ResolutionState::Error);
                error!(
                    %resolution_id,
                    error = %err,
                    iteration = evidence.len(),
                    "Resolution failed"
                );
                self.record(&TranscriptEvent::error(
                    resolution_id,
                    query.user_question,
                    err.to_string(),
                    &evidence,
                ))
                .await;
                Err(ResolutionFailure {
                    resolution_id,
                    error: err,
                    evidence,
                })
            }
        }
    }

    fn validate(query: &Query<'_>) -> Result<(), DelegationError> {
        if query.user_question.trim().is_empty() {
            return Err(DelegationError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }
        if query.context.trim().is_empty() {
            return Err(DelegationError::InvalidInput(
                "context must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn run(
        &self,
        resolution_id: Uuid,
        query: &Query<'_>,
        evidence: &mut EvidenceLog,
        machine: &mut ResolutionStateMachine,
    ) -> Result<(String, Termination), DelegationError> {
        Self::validate(query)?;
        self.check_depth(query.depth)?;

        let max_iterations = self.config.max_iterations;
        let hint = self.config.qualifier_hints && is_ranking_question(query.user_question);
        machine.transition(ResolutionState::Iterate);

        while evidence.len() < max_iterations {
            let iteration = evidence.len() + 1;
            let turns = boss_turns(
                query.user_question,
                evidence.exchanges(),
                iteration,
                max_iterations,
            );

            machine.record_boss_call();
            let raw = self.client.generate(BOSS_SYSTEM_PROMPT, &turns).await?;

            let sub_question = match BossReply::parse(&raw) {
                BossReply::Complete(answer) => {
                    debug!(iteration, "Boss is satisfied");
                    return Ok((answer, Termination::Satisfied));
                }
                BossReply::Malformed(raw) => return Err(DelegationError::Parse { raw }),
                BossReply::Continue(question) if hint => with_qualifier_hint(&question),
                BossReply::Continue(question) => question,
            };
            debug!(iteration, question = %sub_question, "Boss asked");

            machine.record_intern_call();
            let sub_answer = self.intern.answer(&sub_question, query.context).await?;
            let record = evidence.push(sub_question, sub_answer).clone();
            debug!(iteration, chars = record.sub_answer.len(), "Intern answered");
            self.record(&TranscriptEvent::exchange(resolution_id, &record))
                .await;
        }

        machine.transition(ResolutionState::Maxed);
        debug!(max_iterations, "Iteration budget spent, synthesizing");
        machine.record_boss_call();
        let answer = self.synthesize(query.user_question, evidence).await?;
        Ok((answer, Termination::MaxIterations))
    }

    /// One boss call that answers from the evidence alone.
    async fn synthesize(
        &self,
        user_question: &str,
        evidence: &EvidenceLog,
    ) -> Result<String, DelegationError> {
        let history = [Message::user(format_synthesis_request(
            user_question,
            &evidence.render(),
        ))];
        let raw = self
            .client
            .generate(SYNTHESIS_SYSTEM_PROMPT, &history)
            .await?;

        match BossReply::parse(&raw) {
            BossReply::Complete(answer) | BossReply::Continue(answer) => Ok(answer),
            BossReply::Malformed(raw) => Err(DelegationError::Parse { raw }),
        }
    }

    async fn record(&self, event: &TranscriptEvent) {
        if let Err(e) = self.sink.record(event).await {
            warn!(error = %e, kind = event.kind.as_str(), "Failed to record transcript event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ai::{AiError, Role, QUALIFIER_HINT};
    use crate::transcript::{EventKind, MemorySink};

    /// Replays canned replies and remembers every request.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, AiError>>>,
        prompts: Mutex<Vec<(String, Vec<Message>)>>,
    }

    impl Scripted {
        fn new<const N: usize>(replies: [&str; N]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| Ok((*r).to_string())).collect()),
                prompts: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelClient for Scripted {
        async fn generate(&self, role_prompt: &str, history: &[Message]) -> Result<String, AiError> {
            self.prompts
                .lock()
                .unwrap()
                .push((role_prompt.to_string(), history.to_vec()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AiError::RequestFailed("script exhausted".to_string())))
        }
    }

    fn config(max_iterations: usize) -> DelegationConfig {
        DelegationConfig {
            max_iterations,
            ..DelegationConfig::default()
        }
    }

    fn boss(max_iterations: usize, boss: Arc<Scripted>, intern: Arc<Scripted>) -> Boss {
        Boss::new(&config(max_iterations), boss, Intern::new(intern)).unwrap()
    }

    const CONTEXT: &str = "TechCorp was founded in 2010 by Jane Smith.";

    #[test]
    fn test_zero_iterations_rejected_at_construction() {
        let err = Boss::new(
            &config(0),
            Scripted::new([]),
            Intern::new(Scripted::new([])),
        )
        .unwrap_err();
        assert!(matches!(err, DelegationError::InvalidInput(_)));
    }

    #[test]
    fn test_describe() {
        let summary = boss(3, Scripted::new([]), Scripted::new([])).describe();
        assert_eq!(summary.boss_model, "gpt-4");
        assert_eq!(summary.intern_model, "gpt-4o-mini");
        assert_eq!(summary.max_iterations, 3);
        assert_eq!(summary.max_depth, 1);
    }

    #[test]
    fn test_check_depth() {
        let b = boss(1, Scripted::new([]), Scripted::new([]));
        assert!(b.check_depth(0).is_ok());
        assert!(b.check_depth(1).is_ok());
        assert!(matches!(
            b.check_depth(2),
            Err(DelegationError::RecursionLimit {
                depth: 2,
                max_depth: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_immediate_completion() {
        let boss_model = Scripted::new(["FINAL_ANSWER: Jane Smith"]);
        let intern_model = Scripted::new([]);
        let b = boss(5, boss_model.clone(), intern_model.clone());

        let outcome = b.answer("Who founded TechCorp?", CONTEXT, 0).await.unwrap();
        assert_eq!(outcome.final_answer, "Jane Smith");
        assert_eq!(outcome.terminated_by, Termination::Satisfied);
        assert!(outcome.evidence.is_empty());
        assert_eq!(boss_model.calls(), 1);
        assert_eq!(intern_model.calls(), 0);
    }

    #[tokio::test]
    async fn test_boss_sees_previous_exchanges() {
        let boss_model = Scripted::new([
            "What year was it founded and by whom?",
            "FINAL_ANSWER: Jane Smith, in 2010",
        ]);
        let intern_model = Scripted::new(["2010, by Jane Smith"]);
        let b = boss(5, boss_model.clone(), intern_model);

        let outcome = b.answer("Who founded TechCorp?", CONTEXT, 0).await.unwrap();
        assert_eq!(outcome.evidence.len(), 1);

        let prompts = boss_model.prompts.lock().unwrap();
        let (role_prompt, second_turn) = &prompts[1];
        assert_eq!(role_prompt, BOSS_SYSTEM_PROMPT);
        assert_eq!(second_turn.len(), 3);
        assert_eq!(second_turn[1].content, "What year was it founded and by whom?");
        assert!(second_turn[2].content.contains("2010, by Jane Smith"));
        assert!(second_turn[2].content.contains("iteration 2 of 5"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_synthesizes_once() {
        let boss_model = Scripted::new(["First?", "Second?", "Synthesized answer"]);
        let intern_model = Scripted::new(["one", "two"]);
        let b = boss(2, boss_model.clone(), intern_model.clone());

        let outcome = b.answer("Who?", CONTEXT, 0).await.unwrap();
        assert_eq!(outcome.terminated_by, Termination::MaxIterations);
        assert_eq!(outcome.final_answer, "Synthesized answer");
        assert_eq!(outcome.evidence.len(), 2);
        assert_eq!(intern_model.calls(), 2);
        assert_eq!(boss_model.calls(), 3);

        let prompts = boss_model.prompts.lock().unwrap();
        let (role_prompt, history) = &prompts[2];
        assert_eq!(role_prompt, SYNTHESIS_SYSTEM_PROMPT);
        assert!(history[0].content.contains("Q: First?\nA: one"));
    }

    #[tokio::test]
    async fn test_synthesis_strips_sentinel() {
        let boss_model = Scripted::new(["First?", "FINAL_ANSWER: Jane"]);
        let b = boss(1, boss_model, Scripted::new(["Jane"]));

        let outcome = b.answer("Who?", CONTEXT, 0).await.unwrap();
        assert_eq!(outcome.final_answer, "Jane");
        assert_eq!(outcome.terminated_by, Termination::MaxIterations);
    }

    #[tokio::test]
    async fn test_malformed_sentinel_is_parse_error() {
        let boss_model = Scripted::new(["Founded when?", "FINAL_ANSWER:   "]);
        let b = boss(5, boss_model, Scripted::new(["2010"]));

        let failure = b.answer("Who?", CONTEXT, 0).await.unwrap_err();
        assert!(matches!(
            failure.error,
            DelegationError::Parse { ref raw } if raw == "FINAL_ANSWER:   "
        ));
        assert_eq!(failure.terminated_by(), Termination::Error);
        assert_eq!(failure.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_validation_precedes_model_calls() {
        let boss_model = Scripted::new(["FINAL_ANSWER: x"]);
        let b = boss(5, boss_model.clone(), Scripted::new([]));

        let failure = b.answer("Who?", "  \n", 0).await.unwrap_err();
        assert!(matches!(failure.error, DelegationError::InvalidInput(_)));
        let failure = b.answer("", CONTEXT, 0).await.unwrap_err();
        assert!(matches!(failure.error, DelegationError::InvalidInput(_)));
        let failure = b.answer("Who?", CONTEXT, 2).await.unwrap_err();
        assert!(matches!(failure.error, DelegationError::RecursionLimit { .. }));

        assert_eq!(boss_model.calls(), 0);
    }

    #[tokio::test]
    async fn test_qualifier_hint_applied_to_ranking_questions() {
        let boss_model = Scripted::new(["Which company is biggest?", "FINAL_ANSWER: TechCorp"]);
        let intern_model = Scripted::new(["TechCorp"]);
        let mut cfg = config(3);
        cfg.qualifier_hints = true;
        let b = Boss::new(&cfg, boss_model, Intern::new(intern_model.clone())).unwrap();

        let outcome = b
            .answer("What is the largest company?", CONTEXT, 0)
            .await
            .unwrap();
        let recorded = &outcome.evidence.records()[0].sub_question;
        assert!(recorded.ends_with(QUALIFIER_HINT));

        let prompts = intern_model.prompts.lock().unwrap();
        assert!(prompts[0].1[0].content.contains(QUALIFIER_HINT));
    }

    #[tokio::test]
    async fn test_qualifier_hint_not_replayed_to_boss() {
        let echoed = with_qualifier_hint("Which is largest?");
        let boss_model = Scripted::new(["Which is largest?", echoed.as_str(), "FINAL_ANSWER: TechCorp"]);
        let intern_model = Scripted::new(["TechCorp", "TechCorp, worldwide"]);
        let mut cfg = config(3);
        cfg.qualifier_hints = true;
        let b = Boss::new(&cfg, boss_model.clone(), Intern::new(intern_model.clone())).unwrap();

        let outcome = b
            .answer("What is the largest company?", CONTEXT, 0)
            .await
            .unwrap();

        let boss_prompts = boss_model.prompts.lock().unwrap();
        let second_turn = &boss_prompts[1].1;
        assert_eq!(second_turn[1].role, Role::Assistant);
        assert_eq!(second_turn[1].content, "Which is largest?");

        for record in outcome.evidence.records() {
            assert_eq!(record.sub_question.matches(QUALIFIER_HINT).count(), 1);
        }
        let intern_prompts = intern_model.prompts.lock().unwrap();
        assert_eq!(intern_prompts[1].1[0].content.matches(QUALIFIER_HINT).count(), 1);
    }

    #[tokio::test]
    async fn test_transcript_events_recorded() {
        let sink = Arc::new(MemorySink::new());
        let b = boss(
            5,
            Scripted::new(["Founded when?", "FINAL_ANSWER: 2010"]),
            Scripted::new(["In 2010."]),
        )
        .with_sink(sink.clone());

        let outcome = b.answer("When?", CONTEXT, 0).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Exchange);
        assert_eq!(events[1].kind, EventKind::Final);
        assert!(events
            .iter()
            .all(|e| e.resolution_id == outcome.resolution_id));
    }

    #[tokio::test]
    async fn test_error_event_carries_partial_evidence() {
        let sink = Arc::new(MemorySink::new());
        let b = boss(
            5,
            Scripted::new(["Founded when?"]),
            Scripted::new(["In 2010."]),
        )
        .with_sink(sink.clone());

        let failure = b.answer("When?", CONTEXT, 0).await.unwrap_err();
        assert!(matches!(failure.error, DelegationError::ModelUnavailable(_)));

        assert_eq!(sink.count(EventKind::Error), 1);
        let error_event = sink.events().pop().unwrap();
        assert_eq!(error_event.evidence.unwrap().len(), 1);
    }
}
