//! Transcript sinks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::display;

use super::{EventKind, TranscriptError, TranscriptEvent};

/// Receiver of transcript events.
///
/// Recording is fire-and-forget for the boss: a failing sink is logged and
/// ignored, never escalated.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Record one event.
    async fn record(&self, event: &TranscriptEvent) -> Result<(), TranscriptError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl TranscriptSink for NullSink {
    async fn record(&self, _event: &TranscriptEvent) -> Result<(), TranscriptError> {
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TranscriptEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events in order.
    #[must_use]
    pub fn events(&self) -> Vec<TranscriptEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| e.kind == kind).count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranscriptSink for MemorySink {
    async fn record(&self, event: &TranscriptEvent) -> Result<(), TranscriptError> {
        self.events
            .lock()
            .map_err(|_| TranscriptError::Unavailable("memory sink poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Renders events to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    raw_mode: bool,
}

impl ConsoleSink {
    /// Create a console sink. `raw_mode` disables truncation.
    #[must_use]
    pub fn new(raw_mode: bool) -> Self {
        Self { raw_mode }
    }
}

#[async_trait]
impl TranscriptSink for ConsoleSink {
    async fn record(&self, event: &TranscriptEvent) -> Result<(), TranscriptError> {
        match event.kind {
            EventKind::Exchange => display::print_exchange(
                event.iteration.unwrap_or_default(),
                event.question.as_deref().unwrap_or_default(),
                event.answer.as_deref().unwrap_or_default(),
                self.raw_mode,
            ),
            EventKind::Final => display::print_final(
                event.answer.as_deref().unwrap_or_default(),
                event.terminated_by,
                event.iteration.unwrap_or_default(),
            ),
            EventKind::Error => display::print_failure(
                event.message.as_deref().unwrap_or_default(),
                event.iteration.unwrap_or_default(),
                self.raw_mode,
            ),
        }
        Ok(())
    }
}

/// Forwards each event to several sinks.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TranscriptSink>>,
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl TranscriptSink for FanoutSink {
    /// Every sink sees the event; the first failure is reported.
    async fn record(&self, event: &TranscriptEvent) -> Result<(), TranscriptError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
