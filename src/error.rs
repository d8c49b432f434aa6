//! Error types for ragbus.

use thiserror::Error;

use crate::protocol::MsgType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No handler is registered for the envelope's receiver.
    #[error("Unknown receiver: {receiver}")]
    UnknownReceiver { receiver: String },

    /// No pending envelope exists for any known receiver.
    #[error("Pipeline stalled after {last} [trace_id={trace_id}]")]
    Stalled { trace_id: String, last: String },

    /// An envelope reached a handler that does not accept its type.
    #[error("{agent} only handles '{expected}' messages, got '{actual}'")]
    TypeMismatch {
        agent: String,
        expected: MsgType,
        actual: MsgType,
    },

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_messages() {
        let err = Error::TypeMismatch {
            agent: "RetrievalAgent".to_string(),
            expected: MsgType::DocumentsParsed,
            actual: MsgType::UserInput,
        };
        assert_eq!(
            err.to_string(),
            "RetrievalAgent only handles 'documents_parsed' messages, got 'user_input'"
        );

        let err = Error::Stalled {
            trace_id: "t-1".to_string(),
            last: "[user_input] User → IngestionAgent | trace_id=t-1".to_string(),
        };
        assert!(err.to_string().ends_with("[trace_id=t-1]"));
    }
}
