//! Research tools backed by external services

mod arxiv;
mod citation;
mod retrieval;
mod web_search;
mod wikipedia;

pub use arxiv::ArxivTool;
pub use citation::CitationTool;
pub use retrieval::RetrievalTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

use scout_agent::ToolRegistry;
use scout_ai::ModelGateway;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

const USER_AGENT: &str = concat!("scout/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for tool requests
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
}

/// Build the registry of all research tools
pub fn registry(config: &Config, gateway: ModelGateway) -> anyhow::Result<ToolRegistry> {
    let client = http_client()?;
    Ok(ToolRegistry::new()
        .with(Arc::new(WebSearchTool::new(client.clone())))
        .with(Arc::new(RetrievalTool::new(client.clone(), config)))
        .with(Arc::new(WikipediaTool::new(client.clone())))
        .with(Arc::new(ArxivTool::new(client)))
        .with(Arc::new(CitationTool::new(gateway))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_agent::Capability;
    use scout_ai::testing::ScriptedBackend;

    #[test]
    fn test_registry_has_every_tool() {
        let reg = registry(&Config::default(), ModelGateway::new(ScriptedBackend::new("unused", vec![]))).unwrap();
        assert_eq!(
            reg.names(),
            vec![
                "search_web",
                "retrieve_documents",
                "search_wikipedia",
                "search_arxiv",
                "format_citation"
            ]
        );
        assert_eq!(reg.names_with(Capability::DocumentRetrieval), vec!["retrieve_documents"]);
        // retrieval only offered for creator questions
        assert_eq!(reg.eligible(false).len(), 4);
    }
}
