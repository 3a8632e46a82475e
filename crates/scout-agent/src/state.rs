//! Per-thread conversation state and the rules for merging node output into it.

use serde::{Deserialize, Serialize};

/// State persisted per conversation thread.
///
/// `messages` lives for the whole thread; every other field describes the
/// current turn and is rewritten by the planner at the start of each turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    /// The current turn's request
    pub topic: String,
    /// Sub-queries for the current turn
    pub plan: Vec<String>,
    /// Evidence gathered for the current plan
    pub findings: Vec<String>,
    /// Human-readable transcript, never reset
    pub messages: Vec<String>,
    /// Index of the next plan step to execute
    pub current_step: usize,
}

/// Fields of [`ConversationState`] that node output can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Topic,
    Plan,
    Findings,
    Messages,
    CurrentStep,
}

/// How an incoming value combines with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The incoming value overwrites the stored one
    Replace,
    /// Incoming entries are concatenated after the stored ones
    Append,
}

/// Merge policy for every state field.
pub const MERGE_POLICIES: &[(Field, MergePolicy)] = &[
    (Field::Topic, MergePolicy::Replace),
    (Field::Plan, MergePolicy::Replace),
    (Field::Findings, MergePolicy::Replace),
    (Field::Messages, MergePolicy::Append),
    (Field::CurrentStep, MergePolicy::Replace),
];

/// Look up the merge policy for a field
pub fn merge_policy(field: Field) -> MergePolicy {
    MERGE_POLICIES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, p)| *p)
        .unwrap_or(MergePolicy::Replace)
}

/// A partial state update produced by one node.
///
/// `None` leaves a field untouched. `messages` is always a list of new
/// entries; whether they append or replace is decided by [`merge_policy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<usize>,
}

impl StateUpdate {
    /// Update that only sets the topic
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    /// Last transcript entry this update carries
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    /// Whether applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.plan.is_none()
            && self.findings.is_none()
            && self.messages.is_empty()
            && self.current_step.is_none()
    }
}

fn merge_list(field: Field, stored: &mut Vec<String>, incoming: Vec<String>) {
    match merge_policy(field) {
        MergePolicy::Replace => *stored = incoming,
        MergePolicy::Append => stored.extend(incoming),
    }
}

impl ConversationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a node's update into this state
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(topic) = update.topic {
            self.topic = topic;
        }
        if let Some(plan) = update.plan {
            merge_list(Field::Plan, &mut self.plan, plan);
        }
        if let Some(findings) = update.findings {
            merge_list(Field::Findings, &mut self.findings, findings);
        }
        if !update.messages.is_empty() {
            merge_list(Field::Messages, &mut self.messages, update.messages);
        }
        if let Some(step) = update.current_step {
            self.current_step = step;
        }
    }

    /// The plan step waiting to run, if any
    pub fn pending_step(&self) -> Option<&str> {
        self.plan.get(self.current_step).map(String::as_str)
    }

    /// Whether every plan step has been executed
    pub fn plan_exhausted(&self) -> bool {
        self.current_step >= self.plan.len()
    }

    /// Up to `n` most recent transcript entries, oldest first
    pub fn recent_messages(&self, n: usize) -> &[String] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}
