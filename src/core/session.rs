//! Conversation session: follow-up questions share one trace ID so earlier
//! answers on the bus become chat history for the next run.

use crate::agents::{INGESTION_AGENT, USER};
use crate::error::{Error, Result};
use crate::protocol::{generate_trace_id, Bus, ChatTurn, EnvelopeBuilder, Payload, UserInput};

use super::orchestrator::{Orchestrator, RunOutcome};

pub struct Session {
    orchestrator: Orchestrator,
    trace_id: String,
    transcript: Vec<ChatTurn>,
}

impl Session {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            trace_id: generate_trace_id(),
            transcript: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Answered turns of this conversation.
    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn bus(&self) -> &Bus {
        self.orchestrator.bus()
    }

    /// Run one question over `file_paths` within this conversation.
    pub async fn ask(&mut self, question: &str, file_paths: &[String]) -> Result<RunOutcome> {
        let seed = EnvelopeBuilder::from(USER)
            .to(INGESTION_AGENT)
            .payload(UserInput {
                query: question.to_string(),
                file_paths: file_paths.to_vec(),
            })
            .trace_id(self.trace_id.clone())
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;

        let outcome = self.orchestrator.run(seed).await?;

        if let Payload::FinalResponse(p) = outcome.terminal.payload() {
            self.transcript.push(ChatTurn {
                query: p.query.clone(),
                answer: p.response.clone(),
            });
        }

        Ok(outcome)
    }

    /// Start a new conversation: fresh trace ID, empty transcript, no pending envelopes.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.orchestrator.bus_mut().reset();
        self.trace_id = generate_trace_id();
        tracing::info!("Session reset [trace_id={}]", self.trace_id);
    }
}
