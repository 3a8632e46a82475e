//! The plan, research, respond control loop.
//!
//! A turn is a function from `(ConversationState, topic)` to an updated state
//! plus the node events emitted along the way. The planner runs once, the
//! researcher runs once per plan step (once as a no-op for an empty plan) and
//! the responder closes the turn. Node failures never escape: each node turns
//! them into transcript entries, so every turn reaches the responder.

use scout_ai::ModelGateway;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    error::{Error, Result},
    events::{NodeEvent, NodeKind},
    nodes::{planner, researcher, responder},
    state::{ConversationState, StateUpdate},
    tool::ToolRegistry,
};

/// Which tools a selected tool call may resolve against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolScope {
    /// Only tools offered to the model for the current step
    #[default]
    Eligible,
    /// Any registered tool
    FullRegistry,
}

/// Tunables for the control loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Transcript entries shown to the planner
    pub history_window: usize,
    /// Maximum steps kept from a generated plan
    pub plan_steps: usize,
    /// Tool resolution scope at execution time
    pub tool_scope: ToolScope,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            plan_steps: 3,
            tool_scope: ToolScope::Eligible,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.plan_steps == 0 {
            return Err(Error::Config("research.plan_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything a node needs besides the state itself
pub struct GraphContext {
    pub gateway: ModelGateway,
    pub registry: ToolRegistry,
    pub config: ResearchConfig,
}

impl GraphContext {
    pub fn new(gateway: ModelGateway, registry: ToolRegistry) -> Self {
        Self {
            gateway,
            registry,
            config: ResearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: ConversationState,
    pub events: Vec<NodeEvent>,
}

impl TurnOutcome {
    /// The responder's answer
    pub fn answer(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .find(|e| e.node == NodeKind::Responder)
            .and_then(|e| e.last_message())
    }
}

struct Turn<'a> {
    state: ConversationState,
    events: Vec<NodeEvent>,
    observer: Option<&'a mpsc::UnboundedSender<NodeEvent>>,
}

impl Turn<'_> {
    fn emit(&mut self, node: NodeKind, update: StateUpdate) {
        self.state.apply(update.clone());
        let event = NodeEvent { node, update };
        if let Some(tx) = self.observer {
            let _ = tx.send(event.clone());
        }
        self.events.push(event);
    }
}

/// Run one turn for `topic` on top of `state`.
///
/// Node events are pushed to `observer` as each node completes and are also
/// collected into the returned [`TurnOutcome`].
pub async fn run_turn(
    ctx: &GraphContext,
    state: ConversationState,
    topic: &str,
    observer: Option<&mpsc::UnboundedSender<NodeEvent>>,
) -> TurnOutcome {
    let mut turn = Turn {
        state,
        events: Vec::new(),
        observer,
    };
    turn.state.apply(StateUpdate::topic(topic));

    let update = planner::run(ctx, &turn.state).await;
    turn.emit(NodeKind::Planner, update);

    // Every researcher call advances current_step unless the plan is already
    // exhausted, so this runs at most max(1, plan.len()) times.
    loop {
        let update = researcher::step(ctx, &turn.state).await;
        turn.emit(NodeKind::Researcher, update);
        if turn.state.plan_exhausted() {
            break;
        }
    }

    let update = responder::run(ctx, &turn.state).await;
    turn.emit(NodeKind::Responder, update);

    tracing::info!(
        topic,
        steps = turn.state.plan.len(),
        findings = turn.state.findings.len(),
        "Turn complete"
    );

    TurnOutcome {
        state: turn.state,
        events: turn.events,
    }
}
