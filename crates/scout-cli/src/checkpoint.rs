//! File-backed checkpoints: one JSON file per thread

use async_trait::async_trait;
use scout_agent::{Checkpoint, CheckpointStore, ConversationState, Result, ThreadInfo};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each thread as `<dir>/<percent-encoded thread_id>.json`
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(thread_id)))
    }

    async fn read(path: &Path) -> Result<Option<Checkpoint>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// File name for a thread id; distinct ids never share a name and none contain `/`
fn file_stem(thread_id: &str) -> String {
    urlencoding::encode(thread_id).into_owned()
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let path = self.path_for(thread_id);
        match Self::read(&path).await? {
            Some(checkpoint) if checkpoint.thread_id == thread_id => Ok(Some(checkpoint.state)),
            Some(checkpoint) => {
                tracing::warn!(
                    thread_id,
                    stored = %checkpoint.thread_id,
                    path = %path.display(),
                    "Checkpoint belongs to another thread, ignoring"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let checkpoint = Checkpoint::new(thread_id, state.clone());
        let json = serde_json::to_string_pretty(&checkpoint)?;

        // Write then rename so readers never see a half-written file
        let path = self.path_for(thread_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!(thread_id, path = %path.display(), "Saved checkpoint");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThreadInfo>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut threads = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(Some(checkpoint)) => threads.push(checkpoint.info()),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), "Skipping unreadable checkpoint: {}", e),
            }
        }

        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }
}
