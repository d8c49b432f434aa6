//! Driver loop: deliver each envelope to its agent until the user is reached.
//!
//! Agents are registered by name; registration order is also the order in
//! which receivers are polled for the next pending envelope, with the user
//! always polled last.

use std::sync::Arc;

use crate::agents::{Agent, USER};
use crate::error::{Error, Result};
use crate::protocol::{Bus, Envelope};

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub trace_id: String,
    /// The envelope that ended the run (addressed to the user or of a terminal type).
    pub terminal: Arc<Envelope>,
    /// Number of agent invocations.
    pub steps: usize,
}

pub struct Orchestrator {
    bus: Bus,
    agents: Vec<Arc<dyn Agent>>,
}

impl Orchestrator {
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            agents: Vec::new(),
        }
    }

    /// Register an agent. Re-registering a name replaces the handler in place.
    pub fn register(mut self, agent: Arc<dyn Agent>) -> Self {
        if agent.name() == USER {
            tracing::warn!("Ignoring agent registered under reserved name '{}'", USER);
            return self;
        }
        match self.agents.iter().position(|a| a.name() == agent.name()) {
            Some(index) => self.agents[index] = agent,
            None => self.agents.push(agent),
        }
        self
    }

    /// Receiver names in polling order.
    pub fn receivers(&self) -> Vec<&str> {
        self.agents
            .iter()
            .map(|a| a.name())
            .chain(std::iter::once(USER))
            .collect()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.name() == name).cloned()
    }

    fn collect_next(&mut self) -> Option<Arc<Envelope>> {
        let Self { bus, agents } = self;
        agents
            .iter()
            .map(|a| a.name())
            .chain(std::iter::once(USER))
            .find_map(|name| bus.collect(name))
    }

    /// Drive one request from `seed` to a user-addressed or terminal envelope.
    ///
    /// Pending envelopes left over from earlier runs are discarded first.
    pub async fn run(&mut self, seed: Envelope) -> Result<RunOutcome> {
        self.bus.reset();

        let seed = Arc::new(seed);
        let trace_id = seed.trace_id().to_string();
        self.bus.record_seed(Arc::clone(&seed));

        let mut current = seed;
        let mut steps = 0;

        loop {
            if current.receiver() == USER || current.msg_type().is_terminal() {
                tracing::info!("Run finished after {} step(s): {}", steps, current);
                return Ok(RunOutcome {
                    trace_id,
                    terminal: current,
                    steps,
                });
            }

            let agent = self
                .agent(current.receiver())
                .ok_or_else(|| Error::UnknownReceiver {
                    receiver: current.receiver().to_string(),
                })?;
            if agent.accepts() != current.msg_type() {
                return Err(Error::TypeMismatch {
                    agent: agent.name().to_string(),
                    expected: agent.accepts(),
                    actual: current.msg_type(),
                });
            }

            tracing::debug!("Delivering {}", current);
            agent.handle(&current, &mut self.bus).await?;
            steps += 1;

            current = match self.collect_next() {
                Some(next) => next,
                None => {
                    tracing::error!("No message returned; pipeline stuck after {}", current);
                    return Err(Error::Stalled {
                        trace_id,
                        last: current.to_string(),
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{
        IngestionAgent, ResponseAgent, RetrievalAgent, INGESTION_AGENT, RESPONSE_AGENT,
        RETRIEVAL_AGENT,
    };
    use crate::documents::{FsLoader, TextSplitter};
    use crate::generation::AnswerGenerator;
    use crate::protocol::{DocumentsParsed, MsgType, Payload, UserInput};
    use crate::providers::{self, ProviderError};
    use crate::retrieval::HashingEmbedder;
    use async_trait::async_trait;

    struct FixedAnswer;

    #[async_trait]
    impl AnswerGenerator for FixedAnswer {
        async fn generate(
            &self,
            _context: &str,
            _question: &str,
            _history: Option<&str>,
        ) -> providers::Result<String> {
            Ok("X is the 24th letter.".to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl AnswerGenerator for Failing {
        async fn generate(
            &self,
            _context: &str,
            _question: &str,
            _history: Option<&str>,
        ) -> providers::Result<String> {
            Err(ProviderError::Timeout(30))
        }
    }

    fn pipeline(generator: Arc<dyn AnswerGenerator>) -> Orchestrator {
        Orchestrator::new(Bus::new())
            .register(Arc::new(IngestionAgent::new(
                Arc::new(FsLoader::new()),
                TextSplitter::new(1500, 200),
            )))
            .register(Arc::new(RetrievalAgent::new(
                Arc::new(HashingEmbedder::new(384)),
                3,
            )))
            .register(Arc::new(ResponseAgent::new(generator, 300)))
    }

    fn seed(paths: Vec<String>) -> Envelope {
        Envelope::new(
            USER,
            INGESTION_AGENT,
            UserInput {
                query: "What is X?".to_string(),
                file_paths: paths,
            },
            None,
        )
    }

    fn user_bound(bus: &Bus) -> Vec<Arc<Envelope>> {
        bus.log(None)
            .into_iter()
            .filter(|e| e.receiver() == USER)
            .collect()
    }

    #[tokio::test]
    async fn test_single_document_yields_final_response() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, "X is the twenty-fourth letter of the English alphabet.").unwrap();

        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        let outcome = orchestrator
            .run(seed(vec![path.display().to_string()]))
            .await
            .unwrap();

        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.terminal.receiver(), USER);
        match outcome.terminal.payload() {
            Payload::FinalResponse(p) => {
                assert!(p.context_used <= 3);
                assert_eq!(p.response, "X is the 24th letter.");
            }
            other => panic!("unexpected {:?}", other.msg_type()),
        }

        let bus = orchestrator.bus();
        let to_user = user_bound(bus);
        assert_eq!(to_user.len(), 1);
        assert_eq!(to_user[0].msg_type(), MsgType::FinalResponse);

        let chain = bus.log(Some(&outcome.trace_id));
        let types: Vec<MsgType> = chain.iter().map(|e| e.msg_type()).collect();
        assert_eq!(
            types,
            vec![
                MsgType::UserInput,
                MsgType::DocumentsParsed,
                MsgType::ChunksRetrieved,
                MsgType::FinalResponse,
            ]
        );
        assert!(chain.iter().all(|e| e.trace_id() == outcome.trace_id));
        assert_eq!(bus.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_no_loadable_files_stalls() {
        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        let err = orchestrator
            .run(seed(vec!["missing.txt".to_string(), "deck.pptx".to_string()]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Stalled { .. }));
        assert!(user_bound(orchestrator.bus()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_at_retrieval_stalls() {
        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        let envelope = Envelope::new(
            INGESTION_AGENT,
            RETRIEVAL_AGENT,
            DocumentsParsed {
                query: String::new(),
                chunks: vec!["X is a letter.".to_string()],
                metadata: Vec::new(),
            },
            None,
        );

        let err = orchestrator.run(envelope).await.unwrap_err();
        assert!(matches!(err, Error::Stalled { .. }));
        assert!(orchestrator
            .bus()
            .log(None)
            .iter()
            .all(|e| e.msg_type() != MsgType::ChunksRetrieved));
    }

    #[tokio::test]
    async fn test_generation_failure_reports_response_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.md");
        std::fs::write(&path, "# X\n\nX is a letter.").unwrap();

        let mut orchestrator = pipeline(Arc::new(Failing));
        let outcome = orchestrator
            .run(seed(vec![path.display().to_string()]))
            .await
            .unwrap();

        let errors: Vec<_> = orchestrator
            .bus()
            .log(None)
            .into_iter()
            .filter(|e| e.msg_type() == MsgType::ResponseError)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].receiver(), USER);
        match outcome.terminal.payload() {
            Payload::ResponseError(p) => {
                assert!(!p.error.is_empty());
                assert_eq!(p.query, "What is X?");
            }
            other => panic!("unexpected {:?}", other.msg_type()),
        }
    }

    #[tokio::test]
    async fn test_unknown_receiver_fails_fast() {
        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        let envelope = Envelope::new(
            USER,
            "SummaryAgent",
            UserInput {
                query: "q".to_string(),
                file_paths: Vec::new(),
            },
            None,
        );

        let err = orchestrator.run(envelope).await.unwrap_err();
        assert!(matches!(err, Error::UnknownReceiver { receiver } if receiver == "SummaryAgent"));
    }

    #[tokio::test]
    async fn test_type_mismatch_aborts_before_handling() {
        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        let envelope = Envelope::new(
            USER,
            RESPONSE_AGENT,
            UserInput {
                query: "q".to_string(),
                file_paths: Vec::new(),
            },
            None,
        );

        let err = orchestrator.run(envelope).await.unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(orchestrator.bus().log(None).len(), 1);
    }

    #[tokio::test]
    async fn test_run_discards_stale_pending() {
        let mut orchestrator = pipeline(Arc::new(FixedAnswer));
        orchestrator.bus_mut().dispatch(
            INGESTION_AGENT,
            RETRIEVAL_AGENT,
            DocumentsParsed {
                query: "stale".to_string(),
                chunks: vec!["old".to_string()],
                metadata: Vec::new(),
            },
            Some("old-trace"),
        );

        let err = orchestrator.run(seed(Vec::new())).await.unwrap_err();
        assert!(matches!(err, Error::Stalled { .. }));
        assert_eq!(orchestrator.bus().log(Some("old-trace")).len(), 1);
    }

    #[test]
    fn test_polling_order() {
        let orchestrator = pipeline(Arc::new(FixedAnswer));
        assert_eq!(
            orchestrator.receivers(),
            vec![INGESTION_AGENT, RETRIEVAL_AGENT, RESPONSE_AGENT, USER]
        );
    }
}
