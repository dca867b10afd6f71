//! 内存检查点存储（进程内，测试与单机演示用）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::core::AgentError;

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, thread_id: &str) -> Result<Checkpoint, AgentError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_else(|| Checkpoint::empty(thread_id)))
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), AgentError> {
        self.threads
            .write()
            .await
            .insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{History, MessageBody};

    #[tokio::test]
    async fn test_missing_thread_is_empty() {
        let store = InMemoryCheckpointStore::new();
        let cp = store.get("nope").await.unwrap();
        assert!(cp.is_empty());
        assert_eq!(cp.thread_id, "nope");
        assert_eq!(store.thread_count().await, 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_wholesale() {
        let store = InMemoryCheckpointStore::new();
        let mut h = History::new();
        h.extend([MessageBody::user("a"), MessageBody::assistant("b")]);
        store
            .put(&Checkpoint::new("t1", h.messages().to_vec(), 0))
            .await
            .unwrap();

        let mut shorter = History::new();
        shorter.append(MessageBody::user("x"));
        store
            .put(&Checkpoint::new("t1", shorter.messages().to_vec(), 0))
            .await
            .unwrap();

        let cp = store.get("t1").await.unwrap();
        assert_eq!(cp.messages, shorter.messages());
    }
}
