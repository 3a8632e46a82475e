//! Responder: synthesize the turn's findings into the final answer.

use scout_ai::{Context, ModelGateway};

use crate::{
    error::Result,
    graph::GraphContext,
    state::{ConversationState, StateUpdate},
    tool::ERROR_MARKER,
};

fn responder_prompt(topic: &str, findings: &[String]) -> String {
    let context = findings.join("\n\n");
    format!(
        "You are a research assistant. Synthesize a comprehensive answer for the topic \
         '{topic}' based on the following findings:\n\
         \n\
         {context}\n\
         \n\
         If the findings contain error messages (lines mentioning '{ERROR_MARKER}', e.g. \
         'Error executing...'), explicitly apologize to the user and explain what went wrong \
         instead of building an answer from the error text.\n\
         Cite the source of each fact where possible."
    )
}

/// Ask the model for the final answer. No tools are bound.
pub async fn respond(gateway: &ModelGateway, topic: &str, findings: &[String]) -> Result<Vec<String>> {
    let context = Context::from_prompt(responder_prompt(topic, findings));
    let response = gateway.invoke(&context).await?;
    let mut messages: Vec<String> = response.fallback_note().into_iter().collect();
    messages.push(response.text());
    Ok(messages)
}

/// Responder node. The answer is always the last transcript entry it emits.
pub async fn run(ctx: &GraphContext, state: &ConversationState) -> StateUpdate {
    let messages = match respond(&ctx.gateway, &state.topic, &state.findings).await {
        Ok(messages) => {
            tracing::info!("Response generated");
            messages
        }
        Err(e) => {
            tracing::warn!(topic = %state.topic, "Responder failed: {}", e);
            vec![format!(
                "I'm sorry, I couldn't put together an answer for '{}'. {}",
                state.topic, e
            )]
        }
    };
    StateUpdate {
        messages,
        ..Default::default()
    }
}
