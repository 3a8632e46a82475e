//! Tool adapter trait and the typed tool registry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Prefix that marks a tool output as a failure report.
pub const ERROR_MARKER: &str = "Error";

/// What kind of source a tool consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    WebSearch,
    DocumentRetrieval,
    Encyclopedia,
    AcademicSearch,
    CitationFormatting,
}

impl Capability {
    /// Whether the tool is only offered for creator/authorship questions
    pub fn is_gated(&self) -> bool {
        matches!(self, Capability::DocumentRetrieval)
    }
}

/// Text returned by a tool adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text handed to the researcher
    pub content: String,
    /// Whether the adapter hit a failure
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            is_error: false,
        }
    }

    /// Create a failure report, prefixed with [`ERROR_MARKER`]
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let content = if message.starts_with(ERROR_MARKER) {
            message
        } else {
            format!("{}: {}", ERROR_MARKER, message)
        };
        Self {
            content,
            is_error: true,
        }
    }
}

/// A research tool.
///
/// Adapters never fail: problems are reported through [`ToolOutput::error`].
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the LLM
    fn description(&self) -> &str;

    /// Kind of source this tool consults
    fn capability(&self) -> Capability;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("The search query")
    }

    /// Run the tool
    async fn invoke(&self, arguments: serde_json::Value) -> ToolOutput;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn ToolAdapter>;

/// Schema for tools that take a single `query` string
pub fn query_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"]
    })
}

/// Read the `query` argument, accepting a bare string too
pub fn query_arg(arguments: &serde_json::Value) -> Option<&str> {
    match arguments {
        serde_json::Value::String(s) => Some(s),
        other => other.get("query").and_then(|v| v.as_str()),
    }
}

/// Convert a tool to a scout_ai::Tool for API calls
pub fn to_api_tool(tool: &dyn ToolAdapter) -> scout_ai::Tool {
    scout_ai::Tool {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}

/// Tools by name, in registration order, with compiled argument validators
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    schema_cache: HashMap<String, Arc<jsonschema::Validator>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: BoxedTool) {
        self.cache_tool_schema(&tool);
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, tool: BoxedTool) -> Self {
        self.register(tool);
        self
    }

    fn cache_tool_schema(&mut self, tool: &BoxedTool) {
        let schema = tool.parameters_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                self.schema_cache
                    .insert(tool.name().to_string(), Arc::new(validator));
            }
            Err(e) => {
                tracing::warn!(
                    tool = tool.name(),
                    "Tool schema does not compile, arguments will not be validated: {}",
                    e
                );
                self.schema_cache.remove(tool.name());
            }
        }
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Result<&BoxedTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tools offered for a query. Gated capabilities only appear when
    /// `include_gated` is set.
    pub fn eligible(&self, include_gated: bool) -> Vec<BoxedTool> {
        self.tools
            .iter()
            .filter(|t| include_gated || !t.capability().is_gated())
            .cloned()
            .collect()
    }

    /// Names of tools with the given capability
    pub fn names_with(&self, capability: Capability) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| t.capability() == capability)
            .map(|t| t.name())
            .collect()
    }

    /// Check arguments against the tool's schema
    pub fn validate(&self, name: &str, arguments: &serde_json::Value) -> Result<()> {
        let Some(validator) = self.schema_cache.get(name) else {
            return Ok(());
        };
        match validate_with_validator(arguments, validator) {
            None => Ok(()),
            Some(message) => Err(Error::InvalidArguments {
                tool: name.to_string(),
                message,
            }),
        }
    }

    /// Look up, validate and run a tool
    pub async fn invoke(&self, name: &str, arguments: serde_json::Value) -> Result<ToolOutput> {
        let tool = self.get(name)?;
        self.validate(name, &arguments)?;
        tracing::debug!(tool = name, "Invoking tool");
        Ok(tool.invoke(arguments).await)
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        name: &'static str,
        capability: Capability,
    }

    #[async_trait]
    impl ToolAdapter for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Echoes the query"
        }
        fn capability(&self) -> Capability {
            self.capability
        }
        async fn invoke(&self, arguments: serde_json::Value) -> ToolOutput {
            match query_arg(&arguments) {
                Some(q) => ToolOutput::text(format!("echo: {}", q)),
                None => ToolOutput::error("missing query"),
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(EchoTool {
                name: "search_web",
                capability: Capability::WebSearch,
            }))
            .with(Arc::new(EchoTool {
                name: "retrieve_documents",
                capability: Capability::DocumentRetrieval,
            }))
            .with(Arc::new(EchoTool {
                name: "search_arxiv",
                capability: Capability::AcademicSearch,
            }))
    }

    #[test]
    fn test_unknown_tool_is_typed_error() {
        let reg = registry();
        match reg.get("delete_everything") {
            Err(Error::UnknownTool(name)) => assert_eq!(name, "delete_everything"),
            other => panic!("expected UnknownTool, got {:?}", other.map(|t| t.name().to_string())),
        }
    }

    #[test]
    fn test_eligible_gates_document_retrieval() {
        let reg = registry();
        let names = |tools: Vec<BoxedTool>| {
            tools
                .iter()
                .map(|t| t.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(reg.eligible(false)), vec!["search_web", "search_arxiv"]);
        assert_eq!(
            names(reg.eligible(true)),
            vec!["search_web", "retrieve_documents", "search_arxiv"]
        );
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut reg = registry();
        reg.register(Arc::new(EchoTool {
            name: "search_web",
            capability: Capability::Encyclopedia,
        }));
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.get("search_web").unwrap().capability(), Capability::Encyclopedia);
    }

    #[test]
    fn test_validate_missing_query() {
        let reg = registry();
        assert!(reg.validate("search_web", &serde_json::json!({"query": "rust"})).is_ok());
        let err = reg.validate("search_web", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments { .. }));
        assert!(err.to_string().contains("query"), "got: {}", err);
    }

    #[test]
    fn test_validate_wrong_type() {
        let reg = registry();
        let err = reg
            .validate("search_web", &serde_json::json!({"query": 42}))
            .unwrap_err();
        assert!(err.to_string().contains("/query"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_invoke_runs_tool() {
        let out = registry()
            .invoke("search_arxiv", serde_json::json!({"query": "attention"}))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::text("echo: attention"));
    }

    #[test]
    fn test_error_output_has_marker_once() {
        assert_eq!(ToolOutput::error("boom").content, "Error: boom");
        assert_eq!(
            ToolOutput::error("Error: PINECONE_INDEX_NAME not set.").content,
            "Error: PINECONE_INDEX_NAME not set."
        );
    }

    #[test]
    fn test_to_api_tool() {
        let reg = registry();
        let api = to_api_tool(reg.get("search_web").unwrap().as_ref());
        assert_eq!(api.name, "search_web");
        assert_eq!(api.parameters["required"][0], "query");
    }
}
