//! scout-ai: model backends for the research assistant
//!
//! Provides non-streaming OpenAI-compatible and Google Gemini backends behind
//! the [`ModelBackend`] trait, plus a [`ModelGateway`] that retries a failed
//! primary request once against a fallback model.

pub mod error;
pub mod gateway;
pub mod models;
pub mod providers;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{Error, Result};
pub use gateway::{GatewayResponse, ModelGateway, ServedBy};
pub use providers::{ModelBackend, ProviderBackend};
pub use types::*;
