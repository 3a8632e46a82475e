//! Researcher: execute one plan step per call.
//!
//! The step's tool subset is fixed before the model sees it: document
//! retrieval is offered only for creator questions. The model then either
//! picks tools, which run one after another, or answers from its own
//! knowledge. `current_step` advances by one on every call with work left,
//! whatever happens inside the step.

use scout_ai::{Context, Message, ToolCall};

use super::is_creator_question;
use crate::{
    error::Error,
    graph::{GraphContext, ToolScope},
    state::{ConversationState, StateUpdate},
    tool::{BoxedTool, Capability, ERROR_MARKER, to_api_tool},
};

/// Source label for findings the model answered without a tool
pub const INTERNAL_KNOWLEDGE: &str = "LLM Internal Knowledge";

fn researcher_prompt(retrieval_tools: &[&str]) -> String {
    let retrieval = if retrieval_tools.is_empty() {
        "the document retrieval tool".to_string()
    } else {
        retrieval_tools
            .iter()
            .map(|n| format!("'{}'", n))
            .collect::<Vec<_>>()
            .join(" or ")
    };
    format!(
        "You are a research assistant with access to search tools. \
         Use them to find information for the user's query.\n\
         \n\
         RULES:\n\
         1. If the query asks about the 'creator', 'who created this', or the 'author', \
         you MUST use {retrieval}. Do NOT answer from internal knowledge.\n\
         2. For all other queries use web search or the other tools, and do NOT use {retrieval}."
    )
}

/// Finding for a tool that ran
pub fn tool_finding(query: &str, tool: &str, result: &str) -> String {
    format!("Query: {}\nSource: {}\nResult: {}", query, tool, result)
}

/// Finding for a step that could not produce a result
pub fn error_finding(query: &str, note: &str) -> String {
    format!("Query: {}\nSource: {}", query, note)
}

struct StepOutput {
    findings: Vec<String>,
    messages: Vec<String>,
}

/// Researcher node: run the pending plan step, if any.
pub async fn step(ctx: &GraphContext, state: &ConversationState) -> StateUpdate {
    let Some(query) = state.pending_step() else {
        tracing::info!("Research plan execution complete");
        return StateUpdate {
            current_step: Some(state.current_step),
            ..Default::default()
        };
    };

    tracing::info!(
        "Executing step {}/{}: {}",
        state.current_step + 1,
        state.plan.len(),
        query
    );

    let output = match execute_step(ctx, &state.topic, query).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(query, "Research step failed: {}", e);
            StepOutput {
                findings: vec![error_finding(query, &format!("Error: {}", e))],
                messages: vec![format!("Error in researcher node: {}", e)],
            }
        }
    };

    let mut findings = state.findings.clone();
    findings.extend(output.findings);
    StateUpdate {
        findings: Some(findings),
        current_step: Some(state.current_step + 1),
        messages: output.messages,
        ..Default::default()
    }
}

async fn execute_step(ctx: &GraphContext, topic: &str, query: &str) -> Result<StepOutput, Error> {
    let include_retrieval = is_creator_question(topic) || is_creator_question(query);
    let eligible = ctx.registry.eligible(include_retrieval);

    let retrieval_names = ctx.registry.names_with(Capability::DocumentRetrieval);
    let mut context = Context::with_system(researcher_prompt(&retrieval_names))
        .with_tools(eligible.iter().map(|t| to_api_tool(t.as_ref())).collect());
    context.push(Message::user(format!("Query: {}", query)));

    let response = ctx.gateway.invoke(&context).await?;

    let mut output = StepOutput {
        findings: vec![],
        messages: response.fallback_note().into_iter().collect(),
    };

    let calls = response.tool_calls();
    if calls.is_empty() {
        tracing::info!("No tool selected, model answered directly");
        output
            .findings
            .push(tool_finding(query, INTERNAL_KNOWLEDGE, &response.text()));
        output
            .messages
            .push(format!("LLM answered directly for: {}", query));
        return Ok(output);
    }

    tracing::info!(
        "Tool(s) selected: {:?}",
        calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );
    for call in &calls {
        match execute_call(ctx, &eligible, call).await {
            Ok(result) => {
                output
                    .findings
                    .push(tool_finding(query, &call.name, &result));
                output
                    .messages
                    .push(format!("Executed {} for: {}", call.name, query));
            }
            Err(note) => {
                tracing::warn!(tool = %call.name, "{}", note);
                output.findings.push(error_finding(query, &note));
            }
        }
    }
    Ok(output)
}

/// Run one selected tool. `Err` carries the note recorded as the finding's source.
async fn execute_call(
    ctx: &GraphContext,
    eligible: &[BoxedTool],
    call: &ToolCall,
) -> Result<String, String> {
    if let Err(e) = ctx.registry.get(&call.name) {
        return Err(format!("{}: {}", ERROR_MARKER, e));
    }
    if ctx.config.tool_scope == ToolScope::Eligible
        && !eligible.iter().any(|t| t.name() == call.name)
    {
        return Err(format!(
            "Error: Tool {} is not available for this query.",
            call.name
        ));
    }

    match ctx.registry.invoke(&call.name, call.arguments.clone()).await {
        Ok(output) => Ok(output.content),
        Err(e) => Err(format!("Error executing {}: {}", call.name, e)),
    }
}
