//! scout-agent: research runtime
//!
//! This crate provides the plan, research, respond control loop that turns a
//! topic into a cited answer, the tool registry it draws on, and per-thread
//! checkpointing so conversations can resume.

pub mod checkpoint;
pub mod error;
pub mod events;
pub mod graph;
pub mod nodes;
pub mod session;
pub mod state;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore, ThreadInfo};
pub use error::{Error, Result};
pub use events::{NodeEvent, NodeKind, TurnEvent};
pub use graph::{GraphContext, ResearchConfig, ToolScope, TurnOutcome, run_turn};
pub use session::{ResearchSession, TurnStream};
pub use state::{ConversationState, StateUpdate};
pub use tool::{BoxedTool, Capability, ToolAdapter, ToolOutput, ToolRegistry};
