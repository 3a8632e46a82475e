//! Configuration file support

use anyhow::Context as _;
use scout_agent::ResearchConfig;
use scout_ai::Provider;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PRIMARY_PROVIDER: &str = "openai";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FALLBACK_PROVIDER: &str = "google";

/// Configuration for scout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model that answers first
    pub primary_model: Option<String>,
    /// Provider of the primary model
    pub primary_provider: Option<String>,
    /// Model used when the primary fails
    pub fallback_model: Option<String>,
    /// Provider of the fallback model, "none" disables the fallback
    pub fallback_provider: Option<String>,
    pub research: ResearchConfig,
    pub retrieval: RetrievalConfig,
    pub checkpoints: CheckpointConfig,
    /// API keys (alternative to environment variables)
    pub api_keys: ApiKeys,
}

/// Document retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Pinecone index name
    pub index_name: Option<String>,
    /// Pinecone index host; looked up from the index name when unset
    pub index_host: Option<String>,
    /// Documents returned per query
    pub top_k: usize,
    /// OpenAI embedding model
    pub embedding_model: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_name: None,
            index_host: None,
            top_k: 3,
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

/// Checkpoint storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Directory for thread checkpoints
    pub dir: Option<String>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub google: Option<String>,
    pub pinecone: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scout")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SCOUT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file; a missing file yields the defaults
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> anyhow::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Primary provider and model id
    pub fn primary(&self) -> (String, String) {
        (
            self.primary_provider
                .clone()
                .unwrap_or_else(|| DEFAULT_PRIMARY_PROVIDER.to_string()),
            self.primary_model
                .clone()
                .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
        )
    }

    /// Fallback provider and model id, `None` when disabled
    pub fn fallback(&self) -> Option<(String, String)> {
        let provider = self
            .fallback_provider
            .clone()
            .unwrap_or_else(|| DEFAULT_FALLBACK_PROVIDER.to_string());
        if provider.eq_ignore_ascii_case("none") {
            return None;
        }
        Some((
            provider,
            self.fallback_model
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
        ))
    }

    /// Get API key for a provider, checking config then env
    pub fn get_api_key(&self, provider: Provider) -> Option<String> {
        let from_config = match provider {
            Provider::OpenAI => self.api_keys.openai.clone(),
            Provider::Google => self.api_keys.google.clone(),
            _ => None,
        };
        if from_config.is_some() {
            return from_config;
        }

        let env_var = provider.api_key_env_var()?;
        std::env::var(env_var).ok().or_else(|| {
            (provider == Provider::Google)
                .then(|| std::env::var("GEMINI_API_KEY").ok())
                .flatten()
        })
    }

    pub fn pinecone_api_key(&self) -> Option<String> {
        self.api_keys
            .pinecone
            .clone()
            .or_else(|| std::env::var("PINECONE_API_KEY").ok())
    }

    pub fn index_name(&self) -> Option<String> {
        self.retrieval
            .index_name
            .clone()
            .or_else(|| std::env::var("PINECONE_INDEX_NAME").ok())
            .filter(|name| !name.is_empty())
    }

    /// Directory holding thread checkpoints
    pub fn checkpoint_dir(&self) -> PathBuf {
        match &self.checkpoints.dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scout")
                .join("threads"),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# scout configuration file
# Place at ~/.config/scout/config.toml (Linux/Mac) or %APPDATA%\scout\config.toml (Windows)

# Model asked first (providers: openai, google, groq, openrouter, ollama)
primary_provider = "openai"
primary_model = "gpt-4o-mini"

# Model asked when the primary fails; set fallback_provider = "none" to disable
fallback_provider = "google"
fallback_model = "gemini-2.5-flash"

[research]
# Transcript entries shown to the planner
history_window = 5
# Steps kept from each generated plan
plan_steps = 3
# Which tools a model's tool call may use: "eligible" (only those offered
# for the step) or "full_registry"
tool_scope = "eligible"

[retrieval]
# Pinecone index used by retrieve_documents (or set PINECONE_INDEX_NAME)
# index_name = "scout-docs"
top_k = 3
embedding_model = "text-embedding-3-small"

[checkpoints]
# dir = "~/.local/share/scout/threads"

# API keys (optional - can also use environment variables or a .env file)
[api_keys]
# openai = "sk-..."
# google = "..."
# pinecone = "..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_agent::ToolScope;

    #[test]
    fn test_example_config_parses() {
        let cfg = Config::parse(example_config()).unwrap();
        assert_eq!(cfg.primary(), ("openai".to_string(), "gpt-4o-mini".to_string()));
        assert_eq!(
            cfg.fallback(),
            Some(("google".to_string(), "gemini-2.5-flash".to_string()))
        );
        assert_eq!(cfg.research.plan_steps, 3);
        assert_eq!(cfg.research.tool_scope, ToolScope::Eligible);
        assert_eq!(cfg.retrieval.top_k, 3);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.primary().1, DEFAULT_PRIMARY_MODEL);
        assert_eq!(cfg.research.history_window, 5);
        assert_eq!(cfg.retrieval.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_fallback_none_disables() {
        let cfg = Config::parse(r#"fallback_provider = "None""#).unwrap();
        assert!(cfg.fallback().is_none());
    }

    #[test]
    fn test_partial_sections() {
        let cfg = Config::parse(
            r#"
            [research]
            tool_scope = "full_registry"

            [checkpoints]
            dir = "/tmp/scout-threads"

            [api_keys]
            openai = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.research.tool_scope, ToolScope::FullRegistry);
        assert_eq!(cfg.research.plan_steps, 3);
        assert_eq!(cfg.checkpoint_dir(), PathBuf::from("/tmp/scout-threads"));
        assert_eq!(cfg.get_api_key(Provider::OpenAI).as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::parse("primary_model = [").is_err());
    }
}
