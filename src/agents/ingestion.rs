//! Ingestion: load the user's files and split them into chunks.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{halt, type_mismatch, Agent, INGESTION_AGENT, RETRIEVAL_AGENT};
use crate::documents::{Document, DocumentLoader, TextSplitter};
use crate::error::Result;
use crate::protocol::{Bus, DocumentsParsed, Envelope, Metadata, MsgType, Payload};

pub struct IngestionAgent {
    loader: Arc<dyn DocumentLoader>,
    splitter: TextSplitter,
    report_halts: bool,
}

impl IngestionAgent {
    pub fn new(loader: Arc<dyn DocumentLoader>, splitter: TextSplitter) -> Self {
        Self {
            loader,
            splitter,
            report_halts: false,
        }
    }

    pub fn with_report_halts(mut self, report: bool) -> Self {
        self.report_halts = report;
        self
    }

    /// Load every path, skipping the ones that fail.
    fn load_all(&self, file_paths: &[String]) -> Vec<Document> {
        let mut documents = Vec::new();
        for path in file_paths {
            match self.loader.load(Path::new(path)) {
                Ok(docs) => {
                    tracing::info!("Loaded {} doc(s) from {}", docs.len(), path);
                    documents.extend(docs);
                }
                Err(e) => tracing::warn!("Failed to load {}: {}", path, e),
            }
        }
        documents
    }
}

#[async_trait]
impl Agent for IngestionAgent {
    fn name(&self) -> &str {
        INGESTION_AGENT
    }

    fn accepts(&self) -> MsgType {
        MsgType::UserInput
    }

    async fn handle(&self, envelope: &Envelope, bus: &mut Bus) -> Result<()> {
        let Payload::UserInput(input) = envelope.payload() else {
            return Err(type_mismatch(INGESTION_AGENT, self.accepts(), envelope));
        };

        let documents = self.load_all(&input.file_paths);
        if documents.is_empty() {
            halt(
                bus,
                INGESTION_AGENT,
                envelope,
                "No documents loaded.",
                self.report_halts,
            );
            return Ok(());
        }

        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            halt(
                bus,
                INGESTION_AGENT,
                envelope,
                "No chunks after splitting.",
                self.report_halts,
            );
            return Ok(());
        }

        let count = chunks.len();
        let (texts, metadata): (Vec<String>, Vec<Metadata>) = chunks
            .into_iter()
            .map(|c| (c.text, c.metadata))
            .unzip();

        bus.dispatch(
            INGESTION_AGENT,
            RETRIEVAL_AGENT,
            DocumentsParsed {
                query: input.query.clone(),
                chunks: texts,
                metadata,
            },
            Some(envelope.trace_id()),
        );
        tracing::info!(
            "Sent {} chunk(s) to {} [trace_id={}]",
            count,
            RETRIEVAL_AGENT,
            envelope.trace_id()
        );

        Ok(())
    }
}
