//! Model catalog with a small public lookup API.

use crate::{Model, Provider};

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    provider: Provider,
    context_window: u32,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: Provider::OpenAI,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: Provider::OpenAI,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "gpt-5-nano",
        name: "GPT-5 nano",
        provider: Provider::OpenAI,
        context_window: 400_000,
        max_tokens: 128_000,
    },
    ModelEntry {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        provider: Provider::Google,
        context_window: 1_048_576,
        max_tokens: 65_536,
    },
    ModelEntry {
        id: "gemini-2.0-flash",
        name: "Gemini 2.0 Flash",
        provider: Provider::Google,
        context_window: 1_048_576,
        max_tokens: 8_192,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        let (api, base_url) = self.provider.default_endpoint();
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            api,
            provider: self.provider,
            base_url: base_url.to_string(),
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Look up a model by ID only (first match across all providers).
pub fn get_model_by_id(id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// Get all models for a specific provider.
pub fn get_models(provider: Provider) -> Vec<Model> {
    MODEL_ENTRIES
        .iter()
        .filter(|e| e.provider == provider)
        .map(|e| e.to_model())
        .collect()
}

/// Resolve a model: catalog entry when known, otherwise a generic
/// definition pointing at the provider's default endpoint.
pub fn resolve(provider: Provider, id: &str) -> Model {
    if let Some(model) = MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id && e.provider == provider)
    {
        return model.to_model();
    }

    let (api, base_url) = provider.default_endpoint();
    Model {
        id: id.to_string(),
        name: id.to_string(),
        api,
        provider,
        base_url: base_url.to_string(),
        context_window: 128_000,
        max_tokens: 8_192,
        headers: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Api;

    #[test]
    fn test_known_model_lookup() {
        let m = get_model_by_id("gemini-2.5-flash").unwrap();
        assert_eq!(m.provider, Provider::Google);
        assert_eq!(m.api, Api::GoogleGenerativeAI);
    }

    #[test]
    fn test_resolve_unknown_uses_provider_endpoint() {
        let m = resolve(Provider::Groq, "llama-3.3-70b");
        assert_eq!(m.id, "llama-3.3-70b");
        assert_eq!(m.api, Api::OpenAICompletions);
        assert!(m.base_url.contains("groq"));
    }

    #[test]
    fn test_get_models_filters_provider() {
        assert!(get_models(Provider::OpenAI)
            .iter()
            .all(|m| m.provider == Provider::OpenAI));
    }
}
