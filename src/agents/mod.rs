//! Pipeline agents.
//!
//! Each agent consumes one message type and reacts by dispatching at most one
//! envelope on the bus. Agents never call each other.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::protocol::{Bus, Envelope, MsgType, PipelineError};

pub mod ingestion;
pub mod response;
pub mod retrieval;

pub use ingestion::IngestionAgent;
pub use response::ResponseAgent;
pub use retrieval::RetrievalAgent;

pub const USER: &str = "User";
pub const INGESTION_AGENT: &str = "IngestionAgent";
pub const RETRIEVAL_AGENT: &str = "RetrievalAgent";
pub const RESPONSE_AGENT: &str = "LLMResponseAgent";

/// Handler for one message type.
///
/// `handle` returns `Ok(())` whether or not it dispatched a follow-up; an
/// `Err` means the stage was invoked in violation of its contract.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Receiver name this agent is addressed by.
    fn name(&self) -> &str;

    /// The only message type this agent handles.
    fn accepts(&self) -> MsgType;

    async fn handle(&self, envelope: &Envelope, bus: &mut Bus) -> Result<()>;
}

pub(crate) fn type_mismatch(agent: &str, expected: MsgType, envelope: &Envelope) -> Error {
    Error::TypeMismatch {
        agent: agent.to_string(),
        expected,
        actual: envelope.msg_type(),
    }
}

/// Stop the pipeline at `stage`. With `report` set, the user receives a
/// `pipeline_error` envelope; otherwise nothing is dispatched.
pub(crate) fn halt(bus: &mut Bus, stage: &str, envelope: &Envelope, reason: &str, report: bool) {
    tracing::warn!(
        "{}: {} Halting. [trace_id={}]",
        stage,
        reason,
        envelope.trace_id()
    );

    if report {
        bus.dispatch(
            stage,
            USER,
            PipelineError {
                stage: stage.to_string(),
                reason: reason.to_string(),
                query: envelope.payload().query().to_string(),
            },
            Some(envelope.trace_id()),
        );
    }
}
