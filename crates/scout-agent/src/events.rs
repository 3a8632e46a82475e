//! Events emitted while a turn runs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::{ConversationState, StateUpdate};

/// The control-loop node that produced an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Planner,
    Researcher,
    Responder,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Planner => "planner",
            NodeKind::Researcher => "researcher",
            NodeKind::Responder => "responder",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node finished and produced this update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub node: NodeKind,
    pub update: StateUpdate,
}

impl NodeEvent {
    /// Last transcript entry the node emitted
    pub fn last_message(&self) -> Option<&str> {
        self.update.last_message()
    }
}

/// Events yielded by a streamed turn
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum TurnEvent {
    /// A node completed
    Node(NodeEvent),
    /// The turn finished and its state was saved
    Completed(ConversationState),
    /// The turn could not run (checkpoint load/save failed)
    Failed(String),
}
