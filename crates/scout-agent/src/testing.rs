//! Stub tools and gateway helpers shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use scout_ai::{ModelGateway, ToolCall};
use std::sync::Arc;

use crate::tool::{Capability, ToolAdapter, ToolOutput, ToolRegistry, query_arg};

pub use scout_ai::testing::ScriptedBackend;

/// Tool that returns a fixed response and records its arguments.
pub struct StubTool {
    name: String,
    capability: Capability,
    response: ToolOutput,
    seen: Mutex<Vec<serde_json::Value>>,
}

impl StubTool {
    pub fn new(name: &str, capability: Capability, response: ToolOutput) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            capability,
            response,
            seen: Mutex::new(vec![]),
        })
    }

    pub fn retrieval(text: &str) -> Arc<Self> {
        Self::new(
            "retrieve_documents",
            Capability::DocumentRetrieval,
            ToolOutput::text(text),
        )
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl ToolAdapter for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Stub tool"
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    async fn invoke(&self, arguments: serde_json::Value) -> ToolOutput {
        let query = query_arg(&arguments).unwrap_or_default().to_string();
        self.seen.lock().push(arguments);
        let mut out = self.response.clone();
        out.content = out.content.replace("{query}", &query);
        out
    }
}

pub fn gateway(
    primary: Arc<ScriptedBackend>,
    fallback: Option<Arc<ScriptedBackend>>,
) -> ModelGateway {
    let gateway = ModelGateway::new(primary);
    match fallback {
        Some(fb) => gateway.with_fallback(fb),
        None => gateway,
    }
}

/// Registry with every non-gated tool stubbed out
pub fn registry() -> ToolRegistry {
    ToolRegistry::new()
        .with(StubTool::new(
            "search_web",
            Capability::WebSearch,
            ToolOutput::text("web results for {query}"),
        ))
        .with(StubTool::new(
            "search_wikipedia",
            Capability::Encyclopedia,
            ToolOutput::text("Page: {query}"),
        ))
        .with(StubTool::new(
            "search_arxiv",
            Capability::AcademicSearch,
            ToolOutput::text("Title: {query}"),
        ))
        .with(StubTool::new(
            "format_citation",
            Capability::CitationFormatting,
            ToolOutput::text(
                "Vaswani, A., et al. (2017). Attention is all you need. NeurIPS.",
            ),
        ))
}

pub fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: format!("call_{}", name),
        name: name.to_string(),
        arguments,
    }
}
