//! Scripted model backend for unit tests here and in downstream crates.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::{Context, Error, Message, Result, providers::ModelBackend};

/// What a scripted backend answers once its queue is used up
#[derive(Debug, Clone, Copy)]
enum WhenEmpty {
    Default,
    Unavailable,
}

/// Backend that replays canned outcomes and records every request.
pub struct ScriptedBackend {
    id: String,
    outcomes: Mutex<VecDeque<Result<Message>>>,
    when_empty: WhenEmpty,
    seen: Mutex<Vec<Context>>,
}

impl ScriptedBackend {
    fn build(id: &str, outcomes: Vec<Result<Message>>, when_empty: WhenEmpty) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            outcomes: Mutex::new(outcomes.into()),
            when_empty,
            seen: Mutex::new(vec![]),
        })
    }

    /// Replays `outcomes` in order, then answers "default"
    pub fn new(id: &str, outcomes: Vec<Result<Message>>) -> Arc<Self> {
        Self::build(id, outcomes, WhenEmpty::Default)
    }

    /// A backend whose every call fails with "`<id>` is unavailable"
    pub fn failing(id: &str) -> Arc<Self> {
        Self::build(id, vec![], WhenEmpty::Unavailable)
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn requests(&self) -> Vec<Context> {
        self.seen.lock().clone()
    }

    fn next_outcome(&self) -> Result<Message> {
        if let Some(outcome) = self.outcomes.lock().pop_front() {
            return outcome;
        }
        match self.when_empty {
            WhenEmpty::Default => Ok(Message::assistant_text("default")),
            WhenEmpty::Unavailable => Err(Error::api(
                "server_error",
                format!("{} is unavailable", self.id),
            )),
        }
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, context: &Context) -> Result<Message> {
        self.seen.lock().push(context.clone());
        self.next_outcome()
    }
}
