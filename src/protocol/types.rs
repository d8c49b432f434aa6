//! Message types and per-type payloads exchanged between pipeline agents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form metadata attached to a document or chunk (e.g. `source`).
pub type Metadata = BTreeMap<String, Value>;

/// Message type tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MsgType {
    /// Question and files from the user
    UserInput,
    /// Chunked documents from ingestion
    DocumentsParsed,
    /// Top-k chunks from retrieval
    ChunksRetrieved,
    /// Generated answer
    FinalResponse,
    /// Generation failed
    ResponseError,
    /// A stage halted on an empty result
    PipelineError,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::UserInput => "user_input",
            MsgType::DocumentsParsed => "documents_parsed",
            MsgType::ChunksRetrieved => "chunks_retrieved",
            MsgType::FinalResponse => "final_response",
            MsgType::ResponseError => "response_error",
            MsgType::PipelineError => "pipeline_error",
        }
    }

    /// Whether this type ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MsgType::FinalResponse | MsgType::ResponseError | MsgType::PipelineError
        )
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInput {
    pub query: String,
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentsParsed {
    pub query: String,
    pub chunks: Vec<String>,
    /// Same length as `chunks`.
    pub metadata: Vec<Metadata>,
}

/// A chunk selected by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDoc {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One prior question/answer pair of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub query: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunksRetrieved {
    pub query: String,
    pub retrieved_docs: Vec<RetrievedDoc>,
    pub total_chunks: usize,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalResponse {
    pub response: String,
    pub query: String,
    pub context_used: usize,
    /// Retrieved chunks, text truncated.
    pub source_chunks: Vec<RetrievedDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseError {
    pub error: String,
    pub query: String,
    pub context_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineError {
    /// Agent that halted.
    pub stage: String,
    pub reason: String,
    pub query: String,
}

/// Envelope payload, tagged by message type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    UserInput(UserInput),
    DocumentsParsed(DocumentsParsed),
    ChunksRetrieved(ChunksRetrieved),
    FinalResponse(FinalResponse),
    ResponseError(ResponseError),
    PipelineError(PipelineError),
}

impl Payload {
    pub fn msg_type(&self) -> MsgType {
        match self {
            Payload::UserInput(_) => MsgType::UserInput,
            Payload::DocumentsParsed(_) => MsgType::DocumentsParsed,
            Payload::ChunksRetrieved(_) => MsgType::ChunksRetrieved,
            Payload::FinalResponse(_) => MsgType::FinalResponse,
            Payload::ResponseError(_) => MsgType::ResponseError,
            Payload::PipelineError(_) => MsgType::PipelineError,
        }
    }

    /// The user question carried by every payload.
    pub fn query(&self) -> &str {
        match self {
            Payload::UserInput(p) => &p.query,
            Payload::DocumentsParsed(p) => &p.query,
            Payload::ChunksRetrieved(p) => &p.query,
            Payload::FinalResponse(p) => &p.query,
            Payload::ResponseError(p) => &p.query,
            Payload::PipelineError(p) => &p.query,
        }
    }
}

impl From<UserInput> for Payload {
    fn from(p: UserInput) -> Self {
        Payload::UserInput(p)
    }
}

impl From<DocumentsParsed> for Payload {
    fn from(p: DocumentsParsed) -> Self {
        Payload::DocumentsParsed(p)
    }
}

impl From<ChunksRetrieved> for Payload {
    fn from(p: ChunksRetrieved) -> Self {
        Payload::ChunksRetrieved(p)
    }
}

impl From<FinalResponse> for Payload {
    fn from(p: FinalResponse) -> Self {
        Payload::FinalResponse(p)
    }
}

impl From<ResponseError> for Payload {
    fn from(p: ResponseError) -> Self {
        Payload::ResponseError(p)
    }
}

impl From<PipelineError> for Payload {
    fn from(p: PipelineError) -> Self {
        Payload::PipelineError(p)
    }
}
