//! Answer generation from retrieved context.

use async_trait::async_trait;
use std::sync::Arc;

use crate::protocol::ChatTurn;
use crate::providers::{
    complete_with_contract, ExecutionContract, Provider, ProviderError, Result,
};

/// Produces an answer for a question given context and prior turns.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, context: &str, question: &str, history: Option<&str>)
        -> Result<String>;
}

/// Render prior turns as `Q: ...` / `A: ...` lines.
pub fn render_history(turns: &[ChatTurn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    Some(
        turns
            .iter()
            .map(|t| format!("Q: {}\nA: {}", t.query, t.answer))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Fill the QA template in one pass; inserted text is never rescanned.
/// Prior turns are prepended to the question as a follow-up.
pub fn build_prompt(context: &str, question: &str, history: Option<&str>) -> String {
    let question = match history {
        Some(history) if !history.is_empty() => format!("{}\nFollow-up: {}", history, question),
        _ => question.to_string(),
    };
    format!(
        "You are a helpful assistant. Use the following retrieved context to answer the user's question.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Helpful Answer:"
    )
}

/// Generator backed by a chat-completion provider.
pub struct ProviderGenerator {
    provider: Arc<dyn Provider>,
    model: Option<String>,
    contract: ExecutionContract,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            model: None,
            contract: ExecutionContract::default(),
        }
    }

    pub fn with_contract(mut self, contract: ExecutionContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl AnswerGenerator for ProviderGenerator {
    async fn generate(
        &self,
        context: &str,
        question: &str,
        history: Option<&str>,
    ) -> Result<String> {
        let prompt = build_prompt(context, question, history);
        tracing::debug!(
            "Calling {} ({} prompt chars)",
            self.provider.name(),
            prompt.len()
        );

        let answer = complete_with_contract(
            &self.provider,
            &prompt,
            self.model.as_deref(),
            &self.contract,
        )
        .await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ProviderError::other(format!(
                "{} returned an empty answer",
                self.provider.name()
            )));
        }
        Ok(answer.to_string())
    }
}
