//! Thread-aware runner: load, run a turn, save.

use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{OwnedMutexGuard, mpsc};

use crate::{
    checkpoint::{CheckpointStore, ThreadInfo},
    error::Result,
    events::{NodeEvent, TurnEvent},
    graph::{GraphContext, TurnOutcome, run_turn},
    state::ConversationState,
};

type ThreadLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Stream of events for one turn, ending with a terminal [`TurnEvent`]
pub type TurnStream = Pin<Box<dyn Stream<Item = TurnEvent> + Send>>;

/// Runs turns against a checkpoint store.
///
/// Turns on the same thread are serialised by a per-thread lock held from
/// load to save; turns on different threads run concurrently.
pub struct ResearchSession {
    ctx: Arc<GraphContext>,
    store: Arc<dyn CheckpointStore>,
    locks: ThreadLocks,
}

/// Exclusive hold on one thread; drops the map entry once nobody else wants it
struct ThreadGuard<'a> {
    locks: &'a ThreadLocks,
    thread_id: &'a str,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // unlock first so our own handle no longer counts
        self.guard.take();
        if locks
            .get(self.thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(self.thread_id);
        }
    }
}

impl ResearchSession {
    pub fn new(ctx: GraphContext, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_thread<'a>(&'a self, thread_id: &'a str) -> ThreadGuard<'a> {
        let lock = self
            .locks
            .lock()
            .entry(thread_id.to_string())
            .or_default()
            .clone();
        ThreadGuard {
            locks: &self.locks,
            thread_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Saved state for a thread, if any
    pub async fn state(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let _guard = self.lock_thread(thread_id).await;
        self.store.load(thread_id).await
    }

    /// Stored threads, most recent first
    pub async fn threads(&self) -> Result<Vec<ThreadInfo>> {
        self.store.list().await
    }

    /// Run one turn on a thread and persist the result
    pub async fn run(&self, thread_id: &str, topic: &str) -> Result<TurnOutcome> {
        self.run_observed(thread_id, topic, None).await
    }

    /// Like [`run`](Self::run), forwarding node events as they happen
    pub async fn run_observed(
        &self,
        thread_id: &str,
        topic: &str,
        observer: Option<&mpsc::UnboundedSender<NodeEvent>>,
    ) -> Result<TurnOutcome> {
        let _guard = self.lock_thread(thread_id).await;

        let state = self.store.load(thread_id).await?.unwrap_or_default();
        tracing::debug!(
            thread_id,
            messages = state.messages.len(),
            "Loaded thread state"
        );

        let outcome = run_turn(&self.ctx, state, topic, observer).await;
        self.store.save(thread_id, &outcome.state).await?;
        Ok(outcome)
    }

    /// Run a turn in the background and stream its node events.
    pub fn stream(self: &Arc<Self>, thread_id: impl Into<String>, topic: impl Into<String>) -> TurnStream {
        let session = Arc::clone(self);
        let thread_id = thread_id.into();
        let topic = topic.into();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            session.run_observed(&thread_id, &topic, Some(&tx)).await
        });

        Box::pin(async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield TurnEvent::Node(event);
            }
            match handle.await {
                Ok(Ok(outcome)) => yield TurnEvent::Completed(outcome.state),
                Ok(Err(e)) => yield TurnEvent::Failed(e.to_string()),
                Err(e) => yield TurnEvent::Failed(format!("turn task failed: {}", e)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::events::NodeKind;
    use crate::testing::{ScriptedBackend, StubTool, gateway, registry, tool_call};
    use futures::StreamExt;
    use scout_ai::{Error as AiError, Message};

    fn session(primary: Arc<ScriptedBackend>, fallback: Option<Arc<ScriptedBackend>>) -> ResearchSession {
        ResearchSession::new(
            GraphContext::new(gateway(primary, fallback), registry()),
            Arc::new(MemoryCheckpointStore::new()),
        )
    }

    fn emitted_messages(outcome: &TurnOutcome) -> usize {
        outcome.events.iter().map(|e| e.update.messages.len()).sum()
    }

    #[tokio::test]
    async fn test_messages_accumulate_across_turns() {
        let session = session(ScriptedBackend::new("p", vec![]), None);

        let first = session.run("t1", "first topic").await.unwrap();
        let second = session.run("t1", "second topic").await.unwrap();

        let saved = session.state("t1").await.unwrap().unwrap();
        assert_eq!(
            saved.messages.len(),
            emitted_messages(&first) + emitted_messages(&second)
        );
        assert_eq!(saved.topic, "second topic");
        // findings describe the latest plan only
        assert_eq!(saved.findings.len(), saved.plan.len());
    }

    #[tokio::test]
    async fn test_planner_history_sees_previous_turn() {
        let primary = ScriptedBackend::new("p", vec![]);
        let session = session(primary.clone(), None);

        session.run("t", "first topic").await.unwrap();
        session.run("t", "follow up").await.unwrap();

        let requests = primary.requests();
        // second turn's planner request: first turn made 3 calls
        let prompt = requests[3].messages[0].text();
        assert!(prompt.contains("Plan created for 'first topic'"), "got: {}", prompt);
    }

    #[tokio::test]
    async fn test_same_thread_turns_serialise() {
        let session = Arc::new(session(ScriptedBackend::new("p", vec![]), None));

        let (a, b) = tokio::join!(session.run("shared", "one"), session.run("shared", "two"));
        let total = emitted_messages(&a.unwrap()) + emitted_messages(&b.unwrap());

        let saved = session.state("shared").await.unwrap().unwrap();
        assert_eq!(saved.messages.len(), total);
    }

    #[tokio::test]
    async fn test_distinct_threads_independent() {
        let session = session(ScriptedBackend::new("p", vec![]), None);
        session.run("a", "alpha").await.unwrap();
        session.run("b", "beta").await.unwrap();

        assert_eq!(session.state("a").await.unwrap().unwrap().topic, "alpha");
        assert_eq!(session.state("b").await.unwrap().unwrap().topic, "beta");
        assert_eq!(session.threads().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_thread_locks_released_after_turns() {
        let session = Arc::new(session(ScriptedBackend::new("p", vec![]), None));

        session.run("a", "alpha").await.unwrap();
        session.state("b").await.unwrap();
        assert!(session.locks.lock().is_empty());

        let (x, y, z) = tokio::join!(
            session.run("shared", "one"),
            session.run("shared", "two"),
            session.run("other", "three")
        );
        x.unwrap();
        y.unwrap();
        z.unwrap();
        assert!(session.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_thread_lock_kept_while_turn_waits() {
        let session = Arc::new(session(ScriptedBackend::new("p", vec![]), None));

        let held = session.lock_thread("busy").await;
        let waiting = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run("busy", "queued").await.map(|o| o.state.topic) }
        });
        tokio::task::yield_now().await;
        drop(held);
        // the queued turn still owns the entry, so it survives our release
        assert_eq!(waiting.await.unwrap().unwrap(), "queued");
        assert!(session.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stream_yields_nodes_then_completed() {
        let session = Arc::new(session(ScriptedBackend::new("p", vec![]), None));
        let events: Vec<TurnEvent> = session.stream("s", "topic").collect().await;

        let nodes: Vec<NodeKind> = events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::Node(n) => Some(n.node),
                _ => None,
            })
            .collect();
        assert_eq!(
            nodes,
            vec![NodeKind::Planner, NodeKind::Researcher, NodeKind::Responder]
        );
        match events.last() {
            Some(TurnEvent::Completed(state)) => assert_eq!(state.topic, "topic"),
            other => panic!("expected Completed, got {:?}", other),
        }
        assert!(session.state("s").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_citation_turn() {
        let primary = ScriptedBackend::new(
            "p",
            vec![
                Ok(Message::assistant_text(
                    "APA citation for Attention Is All You Need\n\
                     Attention Is All You Need arxiv\n\
                     Vaswani transformer paper publication year",
                )),
                Ok(Message::assistant_tool_calls(vec![tool_call(
                    "format_citation",
                    serde_json::json!({"query": "Attention Is All You Need, Vaswani, APA"}),
                )])),
                Ok(Message::assistant_tool_calls(vec![tool_call(
                    "search_arxiv",
                    serde_json::json!({"query": "Attention Is All You Need"}),
                )])),
                Ok(Message::assistant_text("It was published in 2017.")),
                Ok(Message::assistant_text(
                    "Vaswani, A., et al. (2017). Attention is all you need. [format_citation]",
                )),
            ],
        );
        let session = session(primary, None);

        let topic = "Get the APA citation for 'Attention Is All You Need' by Vaswani";
        let outcome = session.run("cite", topic).await.unwrap();

        assert_eq!(outcome.state.plan.len(), 3);
        assert!(outcome
            .state
            .findings
            .iter()
            .any(|f| f.contains("Source: format_citation")));
        let answer = outcome.answer().unwrap();
        assert!(answer.contains("Vaswani"));
        assert!(answer.contains("2017"));
    }

    #[tokio::test]
    async fn test_primary_always_down_fallback_answers() {
        let primary = ScriptedBackend::failing("primary");
        let fallback = ScriptedBackend::new(
            "fallback",
            vec![
                Ok(Message::assistant_text("a\nb\nc")),
                Ok(Message::assistant_text("fa")),
                Ok(Message::assistant_text("fb")),
                Ok(Message::assistant_text("fc")),
                Ok(Message::assistant_text("final")),
            ],
        );
        let session = session(primary, Some(fallback));

        let outcome = session.run("fb", "topic").await.unwrap();
        assert_eq!(outcome.answer(), Some("final"));
        assert_eq!(outcome.state.current_step, 3);
        assert!(outcome
            .state
            .messages
            .iter()
            .any(|m| m.contains("Used fallback model fallback")));
        assert!(outcome.state.findings.iter().all(|f| !f.contains("Source: Error")));
    }

    #[tokio::test]
    async fn test_both_models_fail_mid_turn() {
        let primary = ScriptedBackend::new(
            "p",
            vec![
                Ok(Message::assistant_text("q1\nq2\nq3")),
                Err(AiError::api("server_error", "primary down")),
                Ok(Message::assistant_text("r2")),
                Ok(Message::assistant_text("r3")),
                Ok(Message::assistant_text(
                    "I'm sorry, one of the searches failed, so this answer is partial.",
                )),
            ],
        );
        let fallback = ScriptedBackend::new("f", vec![Err(AiError::api("server_error", "fallback down"))]);
        let session = session(primary.clone(), Some(fallback));

        let outcome = session.run("x", "topic").await.unwrap();
        let state = &outcome.state;
        assert_eq!(state.current_step, 3);
        assert_eq!(state.findings.len(), 3);
        assert!(state.findings[0].starts_with("Query: q1\nSource: Error"));
        assert!(state.messages.iter().any(|m| m.starts_with("Error in researcher node:")));
        assert!(outcome.answer().unwrap().starts_with("I'm sorry"));

        // the responder saw the error finding
        let last = primary.requests().pop().unwrap();
        assert!(last.messages[0].text().contains("fallback down"));
    }

    #[tokio::test]
    async fn test_creator_turn_with_retrieval_tool() {
        let primary = ScriptedBackend::new(
            "p",
            vec![
                Ok(Message::assistant_tool_calls(vec![tool_call(
                    "retrieve_documents",
                    serde_json::json!({"query": "Who is the creator?"}),
                )])),
                Ok(Message::assistant_text("I was created by the Scout team.")),
            ],
        );
        let session = ResearchSession::new(
            GraphContext::new(
                gateway(primary, None),
                registry().with(StubTool::retrieval("Scout was built by the Scout team.")),
            ),
            Arc::new(MemoryCheckpointStore::new()),
        );

        let outcome = session.run("c", "who is your creator?").await.unwrap();
        assert_eq!(outcome.state.plan, vec!["Who is the creator?"]);
        assert_eq!(
            outcome.state.findings,
            vec!["Query: Who is the creator?\nSource: retrieve_documents\nResult: Scout was built by the Scout team."]
        );
        assert!(outcome.answer().unwrap().contains("Scout team"));
    }
}
