//! Message envelopes with correlation IDs for tracking one request through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{MsgType, Payload};

/// Message envelope wrapping a typed payload with routing metadata.
///
/// Fields are fixed at construction; the next pipeline step is always a new envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Unique envelope ID (ULID)
    id: String,
    /// Originating agent ("User" for the seed)
    sender: String,
    /// Agent that must consume this envelope next
    receiver: String,
    /// Correlation ID shared by every envelope of one request
    trace_id: String,
    /// Creation time
    timestamp: DateTime<Utc>,
    /// Typed payload; serialized as `type` + `payload`
    #[serde(flatten)]
    payload: Payload,
}

impl Envelope {
    /// Create a new envelope, generating a trace ID when none is given.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        payload: impl Into<Payload>,
        trace_id: Option<String>,
    ) -> Self {
        let trace_id = trace_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_trace_id);

        Self {
            id: ulid::Ulid::new().to_string(),
            sender: sender.into(),
            receiver: receiver.into(),
            trace_id,
            timestamp: Utc::now(),
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn msg_type(&self) -> MsgType {
        self.payload.msg_type()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check if this envelope is addressed to a specific agent.
    pub fn is_for(&self, agent: &str) -> bool {
        self.receiver == agent
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} → {} | trace_id={}",
            self.msg_type(),
            self.sender,
            self.receiver,
            self.trace_id
        )
    }
}

/// Builder for creating envelopes with fluent API.
pub struct EnvelopeBuilder {
    sender: String,
    receiver: Option<String>,
    payload: Option<Payload>,
    trace_id: Option<String>,
}

impl EnvelopeBuilder {
    /// Start building an envelope from an agent.
    pub fn from(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            receiver: None,
            payload: None,
            trace_id: None,
        }
    }

    /// Address to an agent.
    pub fn to(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Set the payload.
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Reuse an existing trace ID.
    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Build the envelope.
    pub fn build(self) -> Result<Envelope, &'static str> {
        let receiver = self.receiver.ok_or("Receiver is required")?;
        let payload = self.payload.ok_or("Payload is required")?;
        Ok(Envelope::new(self.sender, receiver, payload, self.trace_id))
    }
}

/// Short random correlation token.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::UserInput;

    fn input() -> UserInput {
        UserInput {
            query: "What is X?".to_string(),
            file_paths: vec!["a.txt".to_string()],
        }
    }

    #[test]
    fn test_envelope_creation() {
        let envelope = Envelope::new("User", "IngestionAgent", input(), None);

        assert_eq!(envelope.sender(), "User");
        assert_eq!(envelope.receiver(), "IngestionAgent");
        assert_eq!(envelope.msg_type(), MsgType::UserInput);
        assert_eq!(envelope.trace_id().len(), 8);
        assert!(!envelope.id().is_empty());
        assert!(envelope.is_for("IngestionAgent"));
    }

    #[test]
    fn test_trace_id_is_kept_when_supplied() {
        let envelope = Envelope::new("User", "IngestionAgent", input(), Some("abc123".to_string()));
        assert_eq!(envelope.trace_id(), "abc123");

        let blank = Envelope::new("User", "IngestionAgent", input(), Some(String::new()));
        assert!(!blank.trace_id().is_empty());
    }

    #[test]
    fn test_envelope_builder() {
        let envelope = EnvelopeBuilder::from("User")
            .to("IngestionAgent")
            .payload(input())
            .trace_id("t-1")
            .build()
            .unwrap();

        assert_eq!(envelope.trace_id(), "t-1");
        assert!(EnvelopeBuilder::from("User").to("IngestionAgent").build().is_err());
    }

    #[test]
    fn test_display_and_wire_form() {
        let envelope = Envelope::new("User", "IngestionAgent", input(), Some("t-1".to_string()));
        assert_eq!(
            envelope.to_string(),
            "[user_input] User → IngestionAgent | trace_id=t-1"
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "user_input");
        assert_eq!(value["receiver"], "IngestionAgent");
        assert_eq!(value["payload"]["query"], "What is X?");

        let back: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }
}
