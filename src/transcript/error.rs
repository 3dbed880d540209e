//! Transcript error types.

use std::path::PathBuf;

/// Errors that can occur while recording or reading transcripts.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    /// Failed to open or create database.
    #[error("Failed to open database at {path}: {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to execute SQL.
    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Blocking task was cancelled.
    #[error("Blocking task cancelled")]
    TaskCancelled,

    /// Failed to create parent directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sink refused the event for another reason.
    #[error("Transcript sink unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_open_display() {
        let err = TranscriptError::DatabaseOpen {
            path: PathBuf::from("/tmp/transcripts.db"),
            source: rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some("test".to_string()),
            ),
        };
        assert!(err.to_string().contains("Failed to open database"));
        assert!(err.to_string().contains("/tmp/transcripts.db"));
    }

    #[test]
    fn test_task_cancelled_display() {
        assert_eq!(
            TranscriptError::TaskCancelled.to_string(),
            "Blocking task cancelled"
        );
    }

    #[test]
    fn test_unavailable_display() {
        let err = TranscriptError::Unavailable("disk full".to_string());
        assert_eq!(err.to_string(), "Transcript sink unavailable: disk full");
    }
}
