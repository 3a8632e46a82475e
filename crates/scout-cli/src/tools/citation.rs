//! Citation formatting backed by the model gateway

use async_trait::async_trait;
use scout_agent::{Capability, ToolAdapter, ToolOutput, tool::query_arg, tool::query_schema};
use scout_ai::{Context, ModelGateway};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CitationStyle {
    Apa,
    Mla,
    Chicago,
    Bibtex,
}

impl CitationStyle {
    /// Style named in the request, APA when none is
    fn detect(query: &str) -> Self {
        let lower = query.to_lowercase();
        if lower.contains("bibtex") {
            Self::Bibtex
        } else if lower.contains("mla") {
            Self::Mla
        } else if lower.contains("chicago") {
            Self::Chicago
        } else {
            Self::Apa
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Apa => "APA",
            Self::Mla => "MLA",
            Self::Chicago => "Chicago",
            Self::Bibtex => "BibTeX",
        })
    }
}

/// Formats a citation for a described work
pub struct CitationTool {
    gateway: ModelGateway,
}

impl CitationTool {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

fn citation_prompt(query: &str, style: CitationStyle) -> String {
    format!(
        "Format a citation in {style} style for the following work: {query}\n\
         Use the real title, authors, venue and year of publication. \
         Reply with the citation only."
    )
}

#[async_trait]
impl ToolAdapter for CitationTool {
    fn name(&self) -> &str {
        "format_citation"
    }

    fn description(&self) -> &str {
        "Formats a citation for a paper, book or article. Describe the work and name the \
         style (APA, MLA, Chicago or BibTeX; APA by default)."
    }

    fn capability(&self) -> Capability {
        Capability::CitationFormatting
    }

    fn parameters_schema(&self) -> Value {
        query_schema("The work to cite and the citation style")
    }

    async fn invoke(&self, arguments: Value) -> ToolOutput {
        let Some(query) = query_arg(&arguments) else {
            return ToolOutput::error("Missing required parameter: query");
        };
        let style = CitationStyle::detect(query);
        tracing::debug!(%style, "Formatting citation");

        let context = Context::from_prompt(citation_prompt(query, style));
        match self.gateway.invoke(&context).await {
            Ok(response) => ToolOutput::text(response.text().trim()),
            Err(e) => ToolOutput::error(format!("Error executing citation formatting: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_ai::Message;
    use scout_ai::testing::ScriptedBackend;
    use std::sync::Arc;

    fn tool(reply: Option<&'static str>) -> (CitationTool, Arc<ScriptedBackend>) {
        let backend = match reply {
            Some(text) => ScriptedBackend::new("m", vec![Ok(Message::assistant_text(text))]),
            None => ScriptedBackend::failing("m"),
        };
        (CitationTool::new(ModelGateway::new(backend.clone())), backend)
    }

    #[test]
    fn test_style_detection() {
        assert_eq!(CitationStyle::detect("Attention Is All You Need"), CitationStyle::Apa);
        assert_eq!(CitationStyle::detect("Deep Learning, Goodfellow, BibTeX"), CitationStyle::Bibtex);
        assert_eq!(CitationStyle::detect("cite in MLA please"), CitationStyle::Mla);
        assert_eq!(CitationStyle::detect("Chicago style"), CitationStyle::Chicago);
    }

    #[tokio::test]
    async fn test_citation_from_model() {
        let (tool, backend) = tool(Some(
            "  Vaswani, A., et al. (2017). Attention is all you need. NeurIPS.\n",
        ));
        let out = tool
            .invoke(serde_json::json!({"query": "Attention Is All You Need by Vaswani"}))
            .await;
        assert!(!out.is_error);
        assert_eq!(out.content, "Vaswani, A., et al. (2017). Attention is all you need. NeurIPS.");
        assert!(backend.requests()[0].messages[0].text().contains("in APA style"));
    }

    #[tokio::test]
    async fn test_model_failure_is_error_text() {
        let (tool, _) = tool(None);
        let out = tool.invoke(serde_json::json!({"query": "x"})).await;
        assert!(out.is_error);
        assert!(out.content.starts_with("Error executing citation formatting:"));
    }
}
