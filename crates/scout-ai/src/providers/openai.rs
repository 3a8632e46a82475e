//! OpenAI Chat Completions API provider

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::{AssistantMetadata, Content, Context, Message, Model, StopReason, Usage},
};

/// OpenAI API client
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Run one chat completion and return the assistant message
    pub async fn complete(&self, model: &Model, context: &Context) -> Result<Message> {
        let request = build_request(model, context);
        let url = format!("{}/chat/completions", model.base_url);
        tracing::debug!(model = %model.id, tools = context.tools.len(), "POST {}", url);

        let mut request_builder = self
            .client
            .post(&url)
            .headers(super::build_headers(model))
            .json(&request);
        if !self.api_key.is_empty() {
            request_builder = request_builder.bearer_auth(&self.api_key);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(super::error_from_response(status, retry_after, &text));
        }

        let body: ChatResponse = response.json().await?;
        parse_response(body, model)
    }
}

fn build_request(model: &Model, context: &Context) -> ChatRequest {
    let mut messages = Vec::new();

    if let Some(ref system_prompt) = context.system_prompt {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system_prompt.clone()),
            tool_calls: None,
        });
    }

    for msg in &context.messages {
        messages.push(convert_message(msg));
    }

    let tools: Option<Vec<ChatTool>> = if context.tools.is_empty() {
        None
    } else {
        Some(
            context
                .tools
                .iter()
                .map(|t| ChatTool {
                    tool_type: "function".to_string(),
                    function: ChatFunction {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    },
                })
                .collect(),
        )
    };

    let tool_choice = tools.as_ref().map(|_| serde_json::json!("auto"));
    ChatRequest {
        model: model.id.clone(),
        messages,
        max_completion_tokens: Some(model.max_tokens / 3),
        tools,
        tool_choice,
    }
}

fn convert_message(msg: &Message) -> ChatMessage {
    match msg {
        Message::User { .. } => ChatMessage {
            role: "user".to_string(),
            content: Some(msg.text()),
            tool_calls: None,
        },
        Message::Assistant { content, .. } => {
            let text = msg.text();
            let tool_calls: Vec<ChatToolCall> = content
                .iter()
                .filter_map(|c| match c {
                    Content::ToolCall {
                        id,
                        name,
                        arguments,
                    } => Some(ChatToolCall {
                        id: id.clone(),
                        call_type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: name.clone(),
                            arguments: arguments.to_string(),
                        },
                    }),
                    _ => None,
                })
                .collect();

            ChatMessage {
                role: "assistant".to_string(),
                content: if text.is_empty() { None } else { Some(text) },
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
            }
        }
    }
}

fn parse_response(body: ChatResponse, model: &Model) -> Result<Message> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response has no choices".to_string()))?;

    let mut content = Vec::new();
    if let Some(text) = choice.message.content {
        if !text.is_empty() {
            content.push(Content::Text { text });
        }
    }

    for tc in choice.message.tool_calls.unwrap_or_default() {
        // Arguments arrive as a JSON-encoded string; keep malformed ones as
        // a raw string so the registry's schema check reports them.
        let arguments = serde_json::from_str(&tc.function.arguments)
            .unwrap_or(serde_json::Value::String(tc.function.arguments));
        content.push(Content::ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments,
        });
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") => Some(StopReason::Stop),
        Some("length") => Some(StopReason::Length),
        Some("tool_calls") => Some(StopReason::ToolUse),
        _ => None,
    };

    let usage = body
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Message::Assistant {
        content,
        metadata: AssistantMetadata {
            api: Some(model.api),
            provider: Some(model.provider),
            model: Some(model.id.clone()),
            usage,
            stop_reason,
            timestamp: chrono::Utc::now().timestamp_millis(),
        },
    })
}

// Request types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

// Response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
