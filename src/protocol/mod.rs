//! Inter-agent message protocol.
//!
//! - Envelopes with correlation (trace) IDs
//! - Typed payloads, one per message type
//! - The in-memory bus that queues and logs envelopes

pub mod bus;
pub mod envelope;
pub mod types;

pub use bus::Bus;
pub use envelope::{generate_trace_id, Envelope, EnvelopeBuilder};
pub use types::{
    ChatTurn, ChunksRetrieved, DocumentsParsed, FinalResponse, Metadata, MsgType, Payload,
    PipelineError, ResponseError, RetrievedDoc, UserInput,
};
