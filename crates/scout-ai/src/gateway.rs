//! Model gateway: a primary backend with an optional fallback.
//!
//! Every request goes to the primary first. Any primary failure is logged and
//! the identical request is replayed once against the fallback. Callers learn
//! which backend answered so they can record fallback usage.

use std::sync::Arc;

use crate::{Context, Error, Message, Result, ToolCall, providers::ModelBackend};

/// Which backend produced a gateway response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Primary,
    Fallback,
}

/// A successful gateway call
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// The assistant message
    pub message: Message,
    /// Model id of the backend that answered
    pub model: String,
    /// Which backend answered
    pub served_by: ServedBy,
    /// The primary's failure when the fallback answered
    pub primary_error: Option<String>,
}

impl GatewayResponse {
    /// Combined text content of the answer
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Tool invocations the model requested, in emission order
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.message.tool_calls()
    }

    /// Whether the fallback backend had to answer
    pub fn used_fallback(&self) -> bool {
        self.served_by == ServedBy::Fallback
    }

    /// Transcript line describing fallback usage, if any
    pub fn fallback_note(&self) -> Option<String> {
        if !self.used_fallback() {
            return None;
        }
        Some(format!(
            "Primary model unavailable ({}). Used fallback model {}.",
            self.primary_error.as_deref().unwrap_or("unknown error"),
            self.model
        ))
    }
}

/// Stateless primary/fallback dispatcher
#[derive(Clone)]
pub struct ModelGateway {
    primary: Arc<dyn ModelBackend>,
    fallback: Option<Arc<dyn ModelBackend>>,
}

impl ModelGateway {
    /// Create a gateway without a fallback
    pub fn new(primary: Arc<dyn ModelBackend>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Set the fallback backend
    pub fn with_fallback(mut self, fallback: Arc<dyn ModelBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Primary model id
    pub fn primary_id(&self) -> &str {
        self.primary.model_id()
    }

    /// Fallback model id, if configured
    pub fn fallback_id(&self) -> Option<&str> {
        self.fallback.as_ref().map(|f| f.model_id())
    }

    /// Send a request, falling back once on any primary failure.
    ///
    /// Without a fallback the primary's error is returned unchanged; when both
    /// fail the result is [`Error::FallbackExhausted`] carrying both errors.
    pub async fn invoke(&self, context: &Context) -> Result<GatewayResponse> {
        let primary_error = match self.primary.complete(context).await {
            Ok(message) => {
                return Ok(GatewayResponse {
                    message,
                    model: self.primary.model_id().to_string(),
                    served_by: ServedBy::Primary,
                    primary_error: None,
                });
            }
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            tracing::warn!(
                model = self.primary.model_id(),
                rate_limited = primary_error.is_rate_limited(),
                "Primary model failed and no fallback is configured: {}",
                primary_error
            );
            return Err(primary_error);
        };

        tracing::warn!(
            primary = self.primary.model_id(),
            fallback = fallback.model_id(),
            rate_limited = primary_error.is_rate_limited(),
            "Primary model unavailable ({}), using fallback model",
            primary_error
        );

        match fallback.complete(context).await {
            Ok(message) => Ok(GatewayResponse {
                message,
                model: fallback.model_id().to_string(),
                served_by: ServedBy::Fallback,
                primary_error: Some(primary_error.to_string()),
            }),
            Err(fallback_error) => {
                tracing::error!(
                    fallback = fallback.model_id(),
                    "Fallback model also failed: {}",
                    fallback_error
                );
                Err(Error::fallback_exhausted(primary_error, fallback_error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = ScriptedBackend::new("p", vec![Ok(Message::assistant_text("from primary"))]);
        let fallback = ScriptedBackend::new("f", vec![]);
        let gateway = ModelGateway::new(primary.clone()).with_fallback(fallback.clone());

        let resp = gateway.invoke(&Context::from_prompt("hi")).await.unwrap();
        assert_eq!(resp.text(), "from primary");
        assert_eq!(resp.served_by, ServedBy::Primary);
        assert!(resp.fallback_note().is_none());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback_with_identical_request() {
        let primary = ScriptedBackend::new("p", vec![Err(Error::api("server_error", "boom"))]);
        let fallback = ScriptedBackend::new("f", vec![Ok(Message::assistant_text("from fallback"))]);
        let gateway = ModelGateway::new(primary.clone()).with_fallback(fallback.clone());

        let context = Context::with_system("sys");
        let resp = gateway.invoke(&context).await.unwrap();
        assert_eq!(resp.text(), "from fallback");
        assert!(resp.used_fallback());
        assert_eq!(resp.model, "f");
        let note = resp.fallback_note().unwrap();
        assert!(note.contains("boom"), "got: {}", note);

        let seen = fallback.requests();
        assert_eq!(seen[0].system_prompt.as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn test_no_fallback_returns_primary_error() {
        let primary = ScriptedBackend::new("p", vec![Err(Error::Auth("bad key".into()))]);
        let gateway = ModelGateway::new(primary);

        let err = gateway.invoke(&Context::from_prompt("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_both_fail_is_fallback_exhausted() {
        let primary = ScriptedBackend::new("p", vec![Err(Error::api("server_error", "p down"))]);
        let fallback =
            ScriptedBackend::new("f", vec![Err(Error::RateLimited { retry_after: None })]);
        let gateway = ModelGateway::new(primary).with_fallback(fallback.clone());

        let err = gateway.invoke(&Context::from_prompt("hi")).await.unwrap_err();
        match err {
            Error::FallbackExhausted { primary, fallback } => {
                assert!(primary.to_string().contains("p down"));
                assert!(matches!(*fallback, Error::RateLimited { .. }));
            }
            other => panic!("expected FallbackExhausted, got {:?}", other),
        }
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_gateway_is_stateless_between_calls() {
        let primary = ScriptedBackend::new(
            "p",
            vec![
                Err(Error::api("server_error", "blip")),
                Ok(Message::assistant_text("recovered")),
            ],
        );
        let fallback = ScriptedBackend::new("f", vec![Ok(Message::assistant_text("fb"))]);
        let gateway = ModelGateway::new(primary).with_fallback(fallback);

        let first = gateway.invoke(&Context::from_prompt("1")).await.unwrap();
        assert!(first.used_fallback());
        let second = gateway.invoke(&Context::from_prompt("2")).await.unwrap();
        assert_eq!(second.served_by, ServedBy::Primary);
        assert_eq!(second.text(), "recovered");
    }
}
