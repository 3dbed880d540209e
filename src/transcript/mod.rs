//! Transcript recording for boss/intern exchanges.

mod error;
mod schema;
mod sink;
mod store;
mod types;

pub use error::TranscriptError;
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use sink::{ConsoleSink, FanoutSink, MemorySink, NullSink, TranscriptSink};
pub use store::{ResolutionSummary, SqliteTranscript};
pub use types::{EventKind, TranscriptEvent};
