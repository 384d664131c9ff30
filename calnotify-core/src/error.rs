//! Error types for calnotify.

use thiserror::Error;

/// Errors that can occur while building or dispatching reminders.
#[derive(Error, Debug)]
pub enum CalNotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration value: {0}")]
    MissingConfig(String),

    #[error("Malformed feed: {0}")]
    Feed(String),

    #[error("Occurrence {occurrence_id} references unknown event {event_id}")]
    MissingReference {
        occurrence_id: String,
        event_id: String,
    },

    #[error("Could not parse date '{value}': {source}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calnotify operations.
pub type CalNotifyResult<T> = Result<T, CalNotifyError>;
