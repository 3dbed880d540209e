//! Shared stubs for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boss_intern::ai::{AiError, Message, ModelClient};
use boss_intern::config::DelegationConfig;
use boss_intern::delegation::{Boss, Intern};
use boss_intern::transcript::{TranscriptError, TranscriptEvent, TranscriptSink};

pub const TECHCORP: &str = "TechCorp was founded in 2010 by Jane Smith.";

/// Model stub that replays scripted replies and counts calls.
///
/// Once the script runs out it repeats its fallback reply, or fails when
/// there is none.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            ..Self::default()
        })
    }

    /// Always answers `reply`.
    pub fn repeating(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(reply.to_string()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Vec<Message>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, role_prompt: &str, history: &[Message]) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((role_prompt.to_string(), history.to_vec()));

        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| AiError::RequestFailed("script exhausted".to_string()))
    }
}

/// Model stub that succeeds `ok_calls` times with `reply`, then fails.
pub struct FailingModel {
    reply: String,
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FailingModel {
    pub fn always() -> Arc<Self> {
        Self::after(0, "")
    }

    pub fn after(ok_calls: usize, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            ok_calls,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for FailingModel {
    async fn generate(&self, _role_prompt: &str, _history: &[Message]) -> Result<String, AiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.ok_calls {
            Ok(self.reply.clone())
        } else {
            Err(AiError::RequestFailed("connection reset by peer".to_string()))
        }
    }
}

/// Sink that rejects every event and counts attempts.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptSink for FailingSink {
    async fn record(&self, _event: &TranscriptEvent) -> Result<(), TranscriptError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TranscriptError::Unavailable("disk full".to_string()))
    }
}

pub fn delegation_config(max_iterations: usize) -> DelegationConfig {
    DelegationConfig {
        max_iterations,
        ..DelegationConfig::default()
    }
}

pub fn boss_with(
    max_iterations: usize,
    boss: Arc<dyn ModelClient>,
    intern: Arc<dyn ModelClient>,
) -> Boss {
    Boss::new(&delegation_config(max_iterations), boss, Intern::new(intern))
        .expect("valid delegation config")
}
