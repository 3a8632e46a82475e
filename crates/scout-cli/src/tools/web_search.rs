//! Web search via the DuckDuckGo instant answer API

use async_trait::async_trait;
use scout_agent::{Capability, ToolAdapter, ToolOutput, tool::query_arg};
use serde_json::Value;

const MAX_RESULTS: usize = 5;

/// Tool for general web lookups
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search(&self, query: &str) -> Result<Value, reqwest::Error> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        tracing::debug!(url = %url, "Web search request");
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// Collect the abstract, related topics and results from an instant answer body
fn format_results(query: &str, body: &Value) -> String {
    let mut results = Vec::new();

    if let Some(text) = body
        .get("AbstractText")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
    {
        let source = body
            .get("AbstractSource")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown");
        let url = body.get("AbstractURL").and_then(|v| v.as_str()).unwrap_or("");
        results.push(format!("[{}] {}\n  URL: {}", source, text, url));
    }

    for key in ["RelatedTopics", "Results"] {
        let Some(items) = body.get(key).and_then(|v| v.as_array()) else {
            continue;
        };
        for item in items {
            if results.len() >= MAX_RESULTS {
                break;
            }
            // Topic groups carry no "Text" and are skipped
            if let Some(text) = item.get("Text").and_then(|v| v.as_str()) {
                let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
                results.push(format!("- {}\n  URL: {}", text, url));
            }
        }
    }

    if results.is_empty() {
        format!("No results found for \"{}\".", query)
    } else {
        format!("Search results for \"{}\":\n\n{}", query, results.join("\n\n"))
    }
}

#[async_trait]
impl ToolAdapter for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Performs a web search for the given query. Use for current events, general facts \
         and anything not covered by an encyclopedia or paper search."
    }

    fn capability(&self) -> Capability {
        Capability::WebSearch
    }

    async fn invoke(&self, arguments: Value) -> ToolOutput {
        let Some(query) = query_arg(&arguments) else {
            return ToolOutput::error("Missing required parameter: query");
        };
        match self.search(query).await {
            Ok(body) => ToolOutput::text(format_results(query, &body)),
            Err(e) => ToolOutput::error(format!("Unable to perform web search. Details: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_abstract_comes_first() {
        let body = json!({
            "AbstractText": "Rust is a systems programming language.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {"Text": "Cargo - package manager", "FirstURL": "https://duckduckgo.com/Cargo"}
            ]
        });
        let out = format_results("rust", &body);
        assert!(out.starts_with("Search results for \"rust\":"));
        let abstract_pos = out.find("[Wikipedia] Rust is").unwrap();
        let topic_pos = out.find("- Cargo").unwrap();
        assert!(abstract_pos < topic_pos);
    }

    #[test]
    fn test_results_capped() {
        let topics: Vec<Value> = (0..10)
            .map(|i| json!({"Text": format!("topic {}", i), "FirstURL": ""}))
            .collect();
        let out = format_results("q", &json!({"AbstractText": "", "RelatedTopics": topics}));
        assert_eq!(out.matches("- topic").count(), MAX_RESULTS);
    }

    #[test]
    fn test_group_entries_without_text_skipped() {
        let body = json!({
            "RelatedTopics": [{"Name": "See also", "Topics": []}],
            "Results": [{"Text": "Official site", "FirstURL": "https://rust-lang.org"}]
        });
        let out = format_results("q", &body);
        assert!(out.contains("- Official site\n  URL: https://rust-lang.org"));
        assert!(!out.contains("See also"));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(format_results("zzz", &json!({})), "No results found for \"zzz\".");
    }

    #[tokio::test]
    async fn test_missing_query_is_error_output() {
        let tool = WebSearchTool::new(reqwest::Client::new());
        let out = tool.invoke(json!({})).await;
        assert!(out.is_error);
        assert!(out.content.starts_with("Error"));
    }
}
