//! Core module - orchestration and conversation sessions.
//!
//! - The driver loop that moves envelopes between agents
//! - Multi-turn sessions sharing one trace ID

pub mod orchestrator;
pub mod session;

pub use orchestrator::{Orchestrator, RunOutcome};
pub use session::Session;

use std::sync::Arc;

use crate::agents::{IngestionAgent, ResponseAgent, RetrievalAgent};
use crate::config::Settings;
use crate::documents::{FsLoader, TextSplitter};
use crate::generation::AnswerGenerator;
use crate::protocol::Bus;
use crate::retrieval::create_embedder;

/// Build the ingestion → retrieval → response pipeline on a fresh bus.
pub fn build_orchestrator(
    settings: &Settings,
    generator: Arc<dyn AnswerGenerator>,
) -> Orchestrator {
    let report_halts = settings.pipeline.report_halts;

    let ingestion = IngestionAgent::new(
        Arc::new(FsLoader::new()),
        TextSplitter::new(
            settings.chunking.chunk_size,
            settings.chunking.chunk_overlap,
        ),
    )
    .with_report_halts(report_halts);
    let retrieval = RetrievalAgent::new(create_embedder(settings), settings.retrieval.top_k)
        .with_report_halts(report_halts);
    let response = ResponseAgent::new(generator, settings.generation.snippet_chars)
        .with_report_halts(report_halts);

    Orchestrator::new(Bus::new())
        .register(Arc::new(ingestion))
        .register(Arc::new(retrieval))
        .register(Arc::new(response))
}
