//! In-memory message bus: pending delivery queue plus an append-only history.
//!
//! One bus is owned per session. The pending queue is a single FIFO filtered
//! by receiver; the history keeps every dispatched envelope for the lifetime
//! of the bus and is never cleared by [`Bus::reset`].

use std::collections::VecDeque;
use std::sync::Arc;

use super::envelope::Envelope;
use super::types::{ChatTurn, MsgType, Payload};

#[derive(Debug, Default)]
pub struct Bus {
    pending: VecDeque<Arc<Envelope>>,
    history: Vec<Arc<Envelope>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a new envelope and return its trace ID (generated if absent).
    pub fn dispatch(
        &mut self,
        sender: &str,
        receiver: &str,
        payload: impl Into<Payload>,
        trace_id: Option<&str>,
    ) -> String {
        let envelope = Arc::new(Envelope::new(
            sender,
            receiver,
            payload,
            trace_id.map(str::to_string),
        ));
        tracing::info!("Sent: {}", envelope);

        let trace_id = envelope.trace_id().to_string();
        self.pending.push_back(Arc::clone(&envelope));
        self.history.push(envelope);
        trace_id
    }

    /// Append a caller-built seed envelope to the history without queueing it.
    pub fn record_seed(&mut self, seed: Arc<Envelope>) {
        tracing::info!("Seed: {}", seed);
        self.history.push(seed);
    }

    /// Remove and return the oldest pending envelope addressed to `agent`.
    pub fn collect(&mut self, agent: &str) -> Option<Arc<Envelope>> {
        let index = self.pending.iter().position(|e| e.is_for(agent))?;
        self.pending.remove(index)
    }

    /// History in dispatch order, optionally restricted to one trace.
    pub fn log(&self, trace_id: Option<&str>) -> Vec<Arc<Envelope>> {
        match trace_id {
            Some(id) => self
                .history
                .iter()
                .filter(|e| e.trace_id() == id)
                .cloned()
                .collect(),
            None => self.history.clone(),
        }
    }

    /// Prior question/answer pairs of one conversation, oldest first.
    pub fn get_chat_history(&self, trace_id: &str) -> Vec<ChatTurn> {
        self.history
            .iter()
            .filter(|e| e.trace_id() == trace_id && e.msg_type() == MsgType::FinalResponse)
            .filter_map(|e| match e.payload() {
                Payload::FinalResponse(p) if !p.query.is_empty() && !p.response.is_empty() => {
                    Some(ChatTurn {
                        query: p.query.clone(),
                        answer: p.response.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Drop undelivered envelopes. History is kept.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!("Discarding {} pending envelope(s)", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Serialize the history (optionally one trace) as pretty JSON.
    pub fn export_log(&self, trace_id: Option<&str>) -> serde_json::Result<String> {
        let entries = self.log(trace_id);
        let entries: Vec<&Envelope> = entries.iter().map(Arc::as_ref).collect();
        serde_json::to_string_pretty(&entries)
    }
}
