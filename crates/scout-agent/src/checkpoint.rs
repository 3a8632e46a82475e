//! Checkpoint storage for per-thread conversation state

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{error::Result, state::ConversationState};

/// Summary of a stored thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub thread_id: String,
    pub updated_at: DateTime<Utc>,
    /// Topic of the most recent turn
    pub topic: String,
    pub message_count: usize,
}

/// A saved thread: state plus bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub updated_at: DateTime<Utc>,
    pub state: ConversationState,
}

impl Checkpoint {
    pub fn new(thread_id: impl Into<String>, state: ConversationState) -> Self {
        Self {
            thread_id: thread_id.into(),
            updated_at: Utc::now(),
            state,
        }
    }

    pub fn info(&self) -> ThreadInfo {
        ThreadInfo {
            thread_id: self.thread_id.clone(),
            updated_at: self.updated_at,
            topic: self.state.topic.clone(),
            message_count: self.state.messages.len(),
        }
    }
}

/// Persists conversation state keyed by thread id.
///
/// `save` must replace the stored state in one step: a reader sees either the
/// previous turn's state or the new one, never a mix.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load a thread's state, `None` if the thread has never been saved
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>>;

    /// Store a thread's state
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()>;

    /// All stored threads, most recently updated first
    async fn list(&self) -> Result<Vec<ThreadInfo>>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryCheckpointStore {
    threads: Mutex<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.threads.lock().get(thread_id).map(|c| c.state.clone()))
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        self.threads
            .lock()
            .insert(thread_id.to_string(), Checkpoint::new(thread_id, state.clone()));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThreadInfo>> {
        let mut threads: Vec<ThreadInfo> = self.threads.lock().values().map(Checkpoint::info).collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_thread_is_none() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryCheckpointStore::new();
        let state = ConversationState {
            topic: "t".into(),
            messages: vec!["m".into()],
            ..Default::default()
        };
        store.save("a", &state).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(state));

        let threads = store.list().await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].thread_id, "a");
        assert_eq!(threads[0].message_count, 1);
    }

    #[tokio::test]
    async fn test_threads_isolated() {
        let store = MemoryCheckpointStore::new();
        let mut a = ConversationState::new();
        a.topic = "alpha".into();
        store.save("a", &a).await.unwrap();
        store.save("b", &ConversationState::new()).await.unwrap();
        assert_eq!(store.load("a").await.unwrap().unwrap().topic, "alpha");
        assert_eq!(store.load("b").await.unwrap().unwrap().topic, "");
    }
}
