//! Answer generation stage. Replies to the user with either a final response
//! or a response error.

use async_trait::async_trait;
use std::sync::Arc;

use super::{halt, type_mismatch, Agent, RESPONSE_AGENT, USER};
use crate::error::Result;
use crate::generation::{render_history, AnswerGenerator};
use crate::protocol::{
    Bus, Envelope, FinalResponse, MsgType, Payload, ResponseError, RetrievedDoc,
};

pub struct ResponseAgent {
    generator: Arc<dyn AnswerGenerator>,
    snippet_chars: usize,
    report_halts: bool,
}

impl ResponseAgent {
    pub fn new(generator: Arc<dyn AnswerGenerator>, snippet_chars: usize) -> Self {
        Self {
            generator,
            snippet_chars,
            report_halts: false,
        }
    }

    pub fn with_report_halts(mut self, report: bool) -> Self {
        self.report_halts = report;
        self
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl Agent for ResponseAgent {
    fn name(&self) -> &str {
        RESPONSE_AGENT
    }

    fn accepts(&self) -> MsgType {
        MsgType::ChunksRetrieved
    }

    async fn handle(&self, envelope: &Envelope, bus: &mut Bus) -> Result<()> {
        let Payload::ChunksRetrieved(retrieved) = envelope.payload() else {
            return Err(type_mismatch(RESPONSE_AGENT, self.accepts(), envelope));
        };

        let query = retrieved.query.as_str();
        if query.is_empty() || retrieved.retrieved_docs.is_empty() {
            halt(
                bus,
                RESPONSE_AGENT,
                envelope,
                "Missing query or retrieved_docs in payload.",
                self.report_halts,
            );
            return Ok(());
        }

        tracing::info!("{}: Generating answer for: '{}'", RESPONSE_AGENT, query);

        let history = render_history(&retrieved.chat_history);
        let context = retrieved
            .retrieved_docs
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let context_used = retrieved.retrieved_docs.len();

        match self
            .generator
            .generate(&context, query, history.as_deref())
            .await
        {
            Ok(answer) => {
                tracing::info!("{}: Response generated successfully.", RESPONSE_AGENT);
                let source_chunks = retrieved
                    .retrieved_docs
                    .iter()
                    .map(|d| RetrievedDoc {
                        text: truncate_chars(&d.text, self.snippet_chars),
                        metadata: d.metadata.clone(),
                    })
                    .collect();

                bus.dispatch(
                    RESPONSE_AGENT,
                    USER,
                    FinalResponse {
                        response: answer,
                        query: retrieved.query.clone(),
                        context_used,
                        source_chunks,
                    },
                    Some(envelope.trace_id()),
                );
            }
            Err(e) => {
                tracing::error!("{}: Error during LLM call: {}", RESPONSE_AGENT, e);
                bus.dispatch(
                    RESPONSE_AGENT,
                    USER,
                    ResponseError {
                        error: e.to_string(),
                        query: retrieved.query.clone(),
                        context_used,
                    },
                    Some(envelope.trace_id()),
                );
            }
        }

        Ok(())
    }
}
