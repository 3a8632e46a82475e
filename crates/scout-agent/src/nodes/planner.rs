//! Planner: turn a topic into an ordered list of research steps.

use scout_ai::{Context, ModelGateway};

use super::{CREATOR_STEP, is_creator_question};
use crate::{
    error::{Error, Result},
    graph::GraphContext,
    state::{ConversationState, StateUpdate},
};

/// A generated plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<String>,
    /// Set when the fallback model wrote the plan
    pub fallback_note: Option<String>,
}

fn planner_prompt(topic: &str, history: &[String], steps: usize) -> String {
    let history = if history.is_empty() {
        "No history.".to_string()
    } else {
        history.join("\n")
    };
    format!(
        "You are a research planner. Use the conversation history below for context if it helps.\n\
         \n\
         History:\n\
         {history}\n\
         \n\
         Current request: '{topic}'\n\
         \n\
         Break the request into exactly {steps} specific search queries or retrieval tasks, \
         each covering a different angle of the request.\n\
         \n\
         Return ONLY the queries, one per line, with no numbering or commentary."
    )
}

/// Split a model reply into plan steps: one per non-blank line, capped at `max`.
pub fn parse_plan(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Produce the plan for `topic`.
///
/// Creator questions short-circuit to [`CREATOR_STEP`] without a model call.
pub async fn plan(
    gateway: &ModelGateway,
    topic: &str,
    recent_messages: &[String],
    max_steps: usize,
) -> Result<Plan> {
    if is_creator_question(topic) {
        return Ok(Plan {
            steps: vec![CREATOR_STEP.to_string()],
            fallback_note: None,
        });
    }

    let context = Context::from_prompt(planner_prompt(topic, recent_messages, max_steps));
    let response = gateway.invoke(&context).await?;
    let steps = parse_plan(&response.text(), max_steps);
    if steps.is_empty() {
        return Err(Error::Planning("model returned an empty plan".into()));
    }
    Ok(Plan {
        steps,
        fallback_note: response.fallback_note(),
    })
}

/// Planner node. Always resets `findings` and `current_step`.
pub async fn run(ctx: &GraphContext, state: &ConversationState) -> StateUpdate {
    let recent = state.recent_messages(ctx.config.history_window);
    let mut update = StateUpdate {
        findings: Some(vec![]),
        current_step: Some(0),
        ..Default::default()
    };

    match plan(&ctx.gateway, &state.topic, recent, ctx.config.plan_steps).await {
        Ok(plan) => {
            tracing::info!(topic = %state.topic, steps = plan.steps.len(), "Plan created");
            tracing::debug!("Plan: {:?}", plan.steps);
            update.messages.extend(plan.fallback_note);
            update.messages.push(format!(
                "Plan created for '{}' with {} steps.",
                state.topic,
                plan.steps.len()
            ));
            update.plan = Some(plan.steps);
        }
        Err(e) => {
            tracing::warn!(topic = %state.topic, "Planning failed: {}", e);
            update.plan = Some(vec![]);
            update.messages.push(format!("Error creating plan: {}", e));
        }
    }
    update
}
