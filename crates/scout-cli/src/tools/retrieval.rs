//! Document retrieval from a Pinecone index

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use scout_agent::{Capability, ToolAdapter, ToolOutput, tool::query_arg};
use scout_ai::Provider;
use serde_json::{Value, json};

use crate::config::Config;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";

/// Embeds the query with OpenAI and returns the closest documents from Pinecone.
///
/// The index holds the assistant's own background documents, so the tool is
/// only offered for questions about who created it.
pub struct RetrievalTool {
    client: reqwest::Client,
    index_name: Option<String>,
    host: Mutex<Option<String>>,
    top_k: usize,
    embedding_model: String,
    openai_key: Option<String>,
    pinecone_key: Option<String>,
}

impl RetrievalTool {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            index_name: config.index_name(),
            host: Mutex::new(config.retrieval.index_host.clone()),
            top_k: config.retrieval.top_k,
            embedding_model: config.retrieval.embedding_model.clone(),
            openai_key: config.get_api_key(Provider::OpenAI),
            pinecone_key: config.pinecone_api_key(),
        }
    }

    async fn embed(&self, query: &str) -> anyhow::Result<Vec<f64>> {
        let key = self.openai_key.as_deref().context("OPENAI_API_KEY not set")?;
        tracing::debug!(url = EMBEDDINGS_URL, model = %self.embedding_model, "Embedding query");
        let body: Value = self
            .client
            .post(EMBEDDINGS_URL)
            .bearer_auth(key)
            .json(&json!({ "model": self.embedding_model, "input": query }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_embedding(&body)
    }

    /// Data-plane host for the index, looked up once by name
    async fn index_host(&self, index_name: &str, key: &str) -> anyhow::Result<String> {
        let cached = self.host.lock().clone();
        if let Some(host) = cached {
            return Ok(host);
        }
        let url = format!("{}/indexes/{}", PINECONE_CONTROL_URL, urlencoding::encode(index_name));
        tracing::debug!(url = %url, "Resolving Pinecone index host");
        let body: Value = self
            .client
            .get(&url)
            .header("Api-Key", key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let host = body
            .get("host")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("index '{}' has no host", index_name))?
            .to_string();
        *self.host.lock() = Some(host.clone());
        Ok(host)
    }

    async fn retrieve(&self, index_name: &str, query: &str) -> anyhow::Result<String> {
        let key = self.pinecone_key.as_deref().context("PINECONE_API_KEY not set")?;
        let vector = self.embed(query).await?;
        let host = self.index_host(index_name, key).await?;

        let url = query_url(&host);
        tracing::debug!(url = %url, top_k = self.top_k, "Querying Pinecone");
        let body: Value = self
            .client
            .post(&url)
            .header("Api-Key", key)
            .json(&json!({
                "vector": vector,
                "topK": self.top_k,
                "includeMetadata": true,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(join_matches(&body))
    }
}

fn query_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}/query", host.trim_end_matches('/'))
    } else {
        format!("https://{}/query", host.trim_end_matches('/'))
    }
}

fn parse_embedding(body: &Value) -> anyhow::Result<Vec<f64>> {
    let values = body
        .pointer("/data/0/embedding")
        .and_then(|v| v.as_array())
        .context("embedding response has no data")?;
    Ok(values.iter().filter_map(|v| v.as_f64()).collect())
}

/// Page contents of the matches, separated by blank lines
fn join_matches(body: &Value) -> String {
    body.get("matches")
        .and_then(|v| v.as_array())
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| m.pointer("/metadata/text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .unwrap_or_default()
}

#[async_trait]
impl ToolAdapter for RetrievalTool {
    fn name(&self) -> &str {
        "retrieve_documents"
    }

    fn description(&self) -> &str {
        "Retrieves relevant documents from the knowledge base. It only holds information \
         about who created this assistant."
    }

    fn capability(&self) -> Capability {
        Capability::DocumentRetrieval
    }

    async fn invoke(&self, arguments: Value) -> ToolOutput {
        let Some(index_name) = self.index_name.as_deref() else {
            return ToolOutput::error("PINECONE_INDEX_NAME not set.");
        };
        let Some(query) = query_arg(&arguments) else {
            return ToolOutput::error("Missing required parameter: query");
        };
        match self.retrieve(index_name, query).await {
            Ok(text) => ToolOutput::text(text),
            Err(e) => ToolOutput::error(format!("Error executing document retrieval: {:#}", e)),
        }
    }
}
