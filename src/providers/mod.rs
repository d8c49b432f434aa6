//! Language-model providers.

use std::sync::Arc;

pub mod contract;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use contract::{complete_with_contract, ExecutionContract};
pub use provider::{Provider, ProviderError, Result};

use crate::config::Settings;

/// Provider factory.
pub fn create_provider(name: &str, settings: &Settings) -> Arc<dyn Provider> {
    let models = &settings.models;
    match name {
        "openai" => Arc::new(openai::OpenAiProvider::with_config(
            models.openai.api_key.clone(),
            models.openai.base_url.clone(),
            models.openai.model.clone(),
        )),
        "ollama" => Arc::new(ollama::OllamaProvider::with_config(
            models.ollama.base_url.clone(),
            models.ollama.model.clone(),
        )),
        other => {
            tracing::warn!("Unknown provider '{}', using ollama", other);
            Arc::new(ollama::OllamaProvider::with_config(
                models.ollama.base_url.clone(),
                models.ollama.model.clone(),
            ))
        }
    }
}

/// Get the current provider from settings.
pub fn get_current_provider(settings: &Settings) -> Arc<dyn Provider> {
    create_provider(&settings.models.provider, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_configured_provider() {
        let mut settings = Settings::default();
        assert_eq!(get_current_provider(&settings).name(), "ollama");

        settings.models.provider = "openai".to_string();
        settings.models.openai.model = Some("gpt-4o".to_string());
        let provider = get_current_provider(&settings);
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o");

        assert_eq!(create_provider("nope", &settings).name(), "ollama");
    }
}
