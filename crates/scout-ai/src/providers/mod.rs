//! LLM Provider implementations

pub mod google;
pub mod openai;

use crate::{Api, Context, Error, Message, Model, Result};
use async_trait::async_trait;

/// A model that can answer a request: the unit the gateway calls.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Identifier used in logs and transcript entries
    fn model_id(&self) -> &str;

    /// Send the request and return the complete assistant message
    async fn complete(&self, context: &Context) -> Result<Message>;
}

/// Backend that talks to a real provider API, chosen by the model's wire protocol
pub enum ProviderBackend {
    OpenAI {
        provider: openai::OpenAIProvider,
        model: Model,
    },
    Google {
        provider: google::GoogleProvider,
        model: Model,
    },
}

impl ProviderBackend {
    /// Build a backend for a model, reading the API key from the environment
    /// when none is provided
    pub fn new(model: Model, api_key: Option<&str>) -> Result<Self> {
        if model.base_url.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "model '{}' has no base URL",
                model.id
            )));
        }
        match model.api {
            Api::OpenAICompletions => {
                let provider = match (api_key, model.provider.api_key_env_var()) {
                    (Some(key), _) => openai::OpenAIProvider::new(key),
                    (None, Some(var)) => openai::OpenAIProvider::new(get_api_key(None, var)?),
                    // Local servers such as Ollama accept any token
                    (None, None) => openai::OpenAIProvider::new(""),
                };
                Ok(Self::OpenAI { provider, model })
            }
            Api::GoogleGenerativeAI => {
                let provider = match api_key {
                    Some(key) => google::GoogleProvider::new(key),
                    None => google::GoogleProvider::from_env()?,
                };
                Ok(Self::Google { provider, model })
            }
        }
    }

    /// The model this backend serves
    pub fn model(&self) -> &Model {
        match self {
            Self::OpenAI { model, .. } | Self::Google { model, .. } => model,
        }
    }
}

#[async_trait]
impl ModelBackend for ProviderBackend {
    fn model_id(&self) -> &str {
        &self.model().id
    }

    async fn complete(&self, context: &Context) -> Result<Message> {
        match self {
            Self::OpenAI { provider, model } => provider.complete(model, context).await,
            Self::Google { provider, model } => provider.complete(model, context).await,
        }
    }
}

/// Get an API key from environment or provided value
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}

/// Map a non-success HTTP response onto the error taxonomy.
///
/// `body` is the raw response text; both OpenAI and Gemini wrap errors as
/// `{"error": {"message": ..., "type"|"status": ...}}`.
pub(crate) fn error_from_response(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> Error {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimited { retry_after };
    }

    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Error::Auth(message);
    }

    let error_type = error
        .and_then(|e| e.get("type").or_else(|| e.get("status")))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("http_{}", status.as_u16()));

    Error::api(error_type, message)
}

/// Read the `retry-after` header in whole seconds
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Build the request headers shared by all providers plus model-specific extras
pub(crate) fn build_headers(model: &Model) -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    for (key, value) in &model.headers {
        if let (Ok(name), Ok(val)) = (
            key.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            headers.insert(name, val);
        }
    }
    headers
}
