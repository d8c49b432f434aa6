//! Retrieval: index the chunks and pick the top-k for the query.

use async_trait::async_trait;
use std::sync::Arc;

use super::{halt, type_mismatch, Agent, RESPONSE_AGENT, RETRIEVAL_AGENT, USER};
use crate::documents::Document;
use crate::error::Result;
use crate::protocol::{
    Bus, ChunksRetrieved, Envelope, Metadata, MsgType, Payload, PipelineError, RetrievedDoc,
};
use crate::providers;
use crate::retrieval::{Embedder, VectorIndex};

pub struct RetrievalAgent {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    report_halts: bool,
}

impl RetrievalAgent {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            embedder,
            top_k,
            report_halts: false,
        }
    }

    pub fn with_report_halts(mut self, report: bool) -> Self {
        self.report_halts = report;
        self
    }

    async fn retrieve(
        &self,
        query: &str,
        documents: Vec<Document>,
    ) -> providers::Result<Vec<Document>> {
        let index = VectorIndex::build(Arc::clone(&self.embedder), documents).await?;
        index.search(query, self.top_k).await
    }
}

#[async_trait]
impl Agent for RetrievalAgent {
    fn name(&self) -> &str {
        RETRIEVAL_AGENT
    }

    fn accepts(&self) -> MsgType {
        MsgType::DocumentsParsed
    }

    async fn handle(&self, envelope: &Envelope, bus: &mut Bus) -> Result<()> {
        let Payload::DocumentsParsed(parsed) = envelope.payload() else {
            return Err(type_mismatch(RETRIEVAL_AGENT, self.accepts(), envelope));
        };

        if parsed.query.is_empty() {
            halt(
                bus,
                RETRIEVAL_AGENT,
                envelope,
                "No query provided.",
                self.report_halts,
            );
            return Ok(());
        }
        if parsed.chunks.is_empty() {
            halt(
                bus,
                RETRIEVAL_AGENT,
                envelope,
                "No chunks to index.",
                self.report_halts,
            );
            return Ok(());
        }

        let documents: Vec<Document> = parsed
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let metadata = parsed.metadata.get(i).cloned().unwrap_or_else(Metadata::new);
                Document::new(chunk.clone(), metadata)
            })
            .collect();

        tracing::info!(
            "{}: Performing retrieval for query: '{}'",
            RETRIEVAL_AGENT,
            parsed.query
        );

        let hits = match self.retrieve(&parsed.query, documents).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("{}: Retrieval failed: {}", RETRIEVAL_AGENT, e);
                bus.dispatch(
                    RETRIEVAL_AGENT,
                    USER,
                    PipelineError {
                        stage: RETRIEVAL_AGENT.to_string(),
                        reason: e.to_string(),
                        query: parsed.query.clone(),
                    },
                    Some(envelope.trace_id()),
                );
                return Ok(());
            }
        };
        tracing::info!("Retrieved {} document(s)", hits.len());

        let retrieved_docs: Vec<RetrievedDoc> = hits
            .into_iter()
            .map(|d| RetrievedDoc {
                text: d.text,
                metadata: d.metadata,
            })
            .collect();
        let chat_history = bus.get_chat_history(envelope.trace_id());

        bus.dispatch(
            RETRIEVAL_AGENT,
            RESPONSE_AGENT,
            ChunksRetrieved {
                query: parsed.query.clone(),
                total_chunks: retrieved_docs.len(),
                retrieved_docs,
                chat_history,
            },
            Some(envelope.trace_id()),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::INGESTION_AGENT;
    use crate::protocol::{DocumentsParsed, FinalResponse};
    use crate::retrieval::HashingEmbedder;

    fn agent() -> RetrievalAgent {
        RetrievalAgent::new(Arc::new(HashingEmbedder::new(128)), 3)
    }

    fn parsed(query: &str, chunks: &[&str]) -> Envelope {
        Envelope::new(
            INGESTION_AGENT,
            RETRIEVAL_AGENT,
            DocumentsParsed {
                query: query.to_string(),
                chunks: chunks.iter().map(|c| c.to_string()).collect(),
                metadata: Vec::new(),
            },
            Some("t-retrieve".to_string()),
        )
    }

    #[tokio::test]
    async fn test_top_k_with_chat_history() {
        let mut bus = Bus::new();
        bus.dispatch(
            RESPONSE_AGENT,
            USER,
            FinalResponse {
                response: "A letter.".to_string(),
                query: "What is X?".to_string(),
                context_used: 1,
                source_chunks: Vec::new(),
            },
            Some("t-retrieve"),
        );
        bus.reset();

        let chunks = ["x one", "x two", "x three", "x four", "x five"];
        agent()
            .handle(&parsed("what about x", &chunks), &mut bus)
            .await
            .unwrap();

        let next = bus.collect(RESPONSE_AGENT).expect("chunks_retrieved");
        assert_eq!(next.trace_id(), "t-retrieve");
        match next.payload() {
            Payload::ChunksRetrieved(p) => {
                assert_eq!(p.retrieved_docs.len(), 3);
                assert_eq!(p.total_chunks, 3);
                assert_eq!(p.chat_history.len(), 1);
                assert_eq!(p.chat_history[0].answer, "A letter.");
                assert!(p.retrieved_docs.iter().all(|d| d.metadata.is_empty()));
            }
            other => panic!("unexpected {:?}", other.msg_type()),
        }
    }

    #[tokio::test]
    async fn test_empty_query_halts_silently() {
        let mut bus = Bus::new();
        agent()
            .handle(&parsed("", &["some chunk"]), &mut bus)
            .await
            .unwrap();

        assert!(bus.collect(RESPONSE_AGENT).is_none());
        assert_eq!(bus.log(None).len(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_query_is_not_missing() {
        let mut bus = Bus::new();
        agent()
            .handle(&parsed(" ", &["some chunk"]), &mut bus)
            .await
            .unwrap();

        let next = bus.collect(RESPONSE_AGENT).expect("chunks_retrieved");
        assert_eq!(next.payload().query(), " ");
    }

    #[tokio::test]
    async fn test_reported_empty_query() {
        let mut bus = Bus::new();
        agent()
            .with_report_halts(true)
            .handle(&parsed("", &["some chunk"]), &mut bus)
            .await
            .unwrap();

        let msg = bus.collect(USER).expect("pipeline_error");
        match msg.payload() {
            Payload::PipelineError(p) => assert_eq!(p.stage, RETRIEVAL_AGENT),
            other => panic!("unexpected {:?}", other.msg_type()),
        }
    }
}
