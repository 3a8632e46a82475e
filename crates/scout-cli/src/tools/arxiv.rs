//! arXiv paper search via the Atom export API

use async_trait::async_trait;
use scout_agent::{Capability, ToolAdapter, ToolOutput, tool::query_arg};
use serde_json::Value;

const API_URL: &str = "https://export.arxiv.org/api/query";
const TOP_K: usize = 3;

pub struct ArxivTool {
    client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Paper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

impl ArxivTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        let url = format!(
            "{}?search_query=all:{}&start=0&max_results={}",
            API_URL,
            urlencoding::encode(query),
            TOP_K
        );
        tracing::debug!(url = %url, "arXiv search request");
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Split an Atom feed into its `<entry>` blocks
fn extract_entries(xml: &str) -> Vec<&str> {
    const OPEN: &str = "<entry>";
    const CLOSE: &str = "</entry>";

    let mut entries = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start..].find(CLOSE) else {
            break;
        };
        let end = start + len + CLOSE.len();
        entries.push(&rest[start..end]);
        rest = &rest[end..];
    }
    entries
}

/// Text of the first `<tag ...>...</tag>` element
fn tag_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    loop {
        let start = from + xml[from..].find(&open)?;
        // skip longer names sharing the prefix, e.g. <author> vs <authors>
        match xml[start + open.len()..].chars().next() {
            Some('>') | Some(' ') => {}
            _ => {
                from = start + open.len();
                continue;
            }
        }
        let content_start = start + xml[start..].find('>')? + 1;
        let content_end = content_start + xml[content_start..].find(&close)?;
        return Some(xml[content_start..content_end].trim());
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_entry(entry: &str) -> Option<Paper> {
    let title = unescape(&normalize_whitespace(tag_text(entry, "title")?));
    let summary = unescape(&normalize_whitespace(tag_text(entry, "summary").unwrap_or("")));
    // keep the date part of the timestamp
    let published = tag_text(entry, "published")
        .map(|p| p.split('T').next().unwrap_or(p).to_string())
        .unwrap_or_default();

    let mut authors = Vec::new();
    let mut rest = entry;
    while let Some(start) = rest.find("<author>") {
        let block = &rest[start..];
        let Some(end) = block.find("</author>") else {
            break;
        };
        if let Some(name) = tag_text(&block[..end], "name") {
            authors.push(unescape(&normalize_whitespace(name)));
        }
        rest = &block[end..];
    }

    Some(Paper {
        published,
        title,
        authors,
        summary,
    })
}

fn parse_feed(xml: &str) -> Vec<Paper> {
    extract_entries(xml)
        .into_iter()
        .filter_map(parse_entry)
        .take(TOP_K)
        .collect()
}

fn format_papers(papers: &[Paper]) -> String {
    if papers.is_empty() {
        return "No good Arxiv Result was found".to_string();
    }
    papers
        .iter()
        .map(|p| {
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                p.published,
                p.title,
                p.authors.join(", "),
                p.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl ToolAdapter for ArxivTool {
    fn name(&self) -> &str {
        "search_arxiv"
    }

    fn description(&self) -> &str {
        "Searches arXiv for academic papers. Returns publication date, title, authors and \
         abstract of the best matches."
    }

    fn capability(&self) -> Capability {
        Capability::AcademicSearch
    }

    async fn invoke(&self, arguments: Value) -> ToolOutput {
        let Some(query) = query_arg(&arguments) else {
            return ToolOutput::error("Missing required parameter: query");
        };
        match self.fetch(query).await {
            Ok(xml) => ToolOutput::text(format_papers(&parse_feed(&xml))),
            Err(e) => ToolOutput::error(format!("Error executing Arxiv search: {}", e)),
        }
    }
}
