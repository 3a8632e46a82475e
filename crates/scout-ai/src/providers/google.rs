//! Google Generative AI (Gemini) API provider

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::{AssistantMetadata, Content, Context, Message, Model, StopReason, Usage},
};

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleProvider {
    /// Create a new Google provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create from environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| Error::InvalidApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Run one generateContent call and return the assistant message
    pub async fn complete(&self, model: &Model, context: &Context) -> Result<Message> {
        let request = build_request(model, context);
        let url = format!("{}/models/{}:generateContent", model.base_url, model.id);
        tracing::debug!(model = %model.id, tools = context.tools.len(), "POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(super::build_headers(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(super::error_from_response(status, retry_after, &text));
        }

        let body: GeminiResponse = response.json().await?;
        parse_response(body, model)
    }
}

fn build_request(model: &Model, context: &Context) -> GeminiRequest {
    let contents = context.messages.iter().filter_map(convert_message).collect();

    let system_instruction = context.system_prompt.as_ref().map(|prompt| GeminiContent {
        role: None,
        parts: vec![GeminiPart::Text {
            text: prompt.clone(),
        }],
    });

    let tools = if context.tools.is_empty() {
        None
    } else {
        Some(vec![GeminiTool {
            function_declarations: context
                .tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: Some(t.parameters.clone()),
                })
                .collect(),
        }])
    };

    GeminiRequest {
        contents,
        system_instruction,
        tools,
        generation_config: Some(GeminiGenerationConfig {
            max_output_tokens: Some(model.max_tokens / 3),
        }),
    }
}

fn convert_message(msg: &Message) -> Option<GeminiContent> {
    let (role, content) = match msg {
        Message::User { content, .. } => ("user", content),
        Message::Assistant { content, .. } => ("model", content),
    };

    let parts: Vec<GeminiPart> = content
        .iter()
        .map(|c| match c {
            Content::Text { text } => GeminiPart::Text { text: text.clone() },
            // Gemini has no call ids; the name carries the match
            Content::ToolCall {
                name, arguments, ..
            } => GeminiPart::FunctionCall {
                function_call: GeminiFunctionCall {
                    name: name.clone(),
                    args: arguments.clone(),
                },
            },
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: Some(role.to_string()),
            parts,
        })
    }
}

fn parse_response(body: GeminiResponse, model: &Model) -> Result<Message> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response has no candidates".to_string()))?;

    let mut text = String::new();
    let mut calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        match part {
            GeminiResponsePart::Text { text: t } => text.push_str(&t),
            GeminiResponsePart::FunctionCall { function_call } => {
                let id = format!("call_{}", calls.len());
                calls.push(Content::ToolCall {
                    id,
                    name: function_call.name,
                    arguments: function_call.args,
                });
            }
            GeminiResponsePart::Other(_) => {}
        }
    }

    let stop_reason = if !calls.is_empty() {
        Some(StopReason::ToolUse)
    } else {
        match candidate.finish_reason.as_deref() {
            Some("STOP") => Some(StopReason::Stop),
            Some("MAX_TOKENS") => Some(StopReason::Length),
            _ => None,
        }
    };

    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(Content::Text { text });
    }
    content.extend(calls);

    let usage = body
        .usage_metadata
        .map(|u| Usage {
            input: u.prompt_token_count.unwrap_or(0),
            output: u.candidates_token_count.unwrap_or(0),
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
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiResponsePart {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    Text {
        text: String,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
