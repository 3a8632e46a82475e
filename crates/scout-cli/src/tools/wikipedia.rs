//! Wikipedia search via the MediaWiki API

use async_trait::async_trait;
use scout_agent::{Capability, ToolAdapter, ToolOutput, tool::query_arg};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::utils::truncate_chars;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const TOP_K: usize = 3;
const MAX_CHARS: usize = 4000;

pub struct WikipediaTool {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    /// Search rank
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: String,
}

impl WikipediaTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, reqwest::Error> {
        let limit = TOP_K.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("exlimit", limit.as_str()),
            ("redirects", "1"),
        ];
        tracing::debug!(url = API_URL, query, "Wikipedia search request");
        self.client
            .get(API_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// Format pages in search-rank order
fn format_pages(response: SearchResponse) -> String {
    let mut pages: Vec<Page> = response
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|p| p.index);

    let summaries: Vec<String> = pages
        .into_iter()
        .take(TOP_K)
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
        .collect();

    if summaries.is_empty() {
        "No good Wikipedia Search Result was found".to_string()
    } else {
        truncate_chars(&summaries.join("\n\n"), MAX_CHARS)
    }
}

#[async_trait]
impl ToolAdapter for WikipediaTool {
    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn description(&self) -> &str {
        "Searches Wikipedia for the query. Good for definitions, history and background on \
         well-known people, places and concepts."
    }

    fn capability(&self) -> Capability {
        Capability::Encyclopedia
    }

    async fn invoke(&self, arguments: Value) -> ToolOutput {
        let Some(query) = query_arg(&arguments) else {
            return ToolOutput::error("Missing required parameter: query");
        };
        match self.search(query).await {
            Ok(response) => ToolOutput::text(format_pages(response)),
            Err(e) => ToolOutput::error(format!("Error executing Wikipedia search: {}", e)),
        }
    }
}
