//! SQLite 检查点存储
//!
//! 每个线程一行，消息序列以 JSON 存储；put 用 upsert 整体覆盖。
//! rusqlite 是同步接口，读写都放到 spawn_blocking 中执行，避免阻塞 async 运行时。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::core::AgentError;
use crate::memory::Message;

pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// 打开（必要时创建）数据库文件并建表
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, AgentError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| AgentError::Persistence(e.to_string()))?;
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AgentError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AgentError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                messages TEXT NOT NULL,
                steps INTEGER NOT NULL,
                updated_at TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, AgentError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, AgentError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AgentError::Persistence("sqlite connection poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AgentError::Persistence(format!("sqlite task: {}", e)))?
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, thread_id: &str) -> Result<Checkpoint, AgentError> {
        let id = thread_id.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, i64, String)> = conn
                .query_row(
                    "SELECT messages, steps, updated_at FROM checkpoints WHERE thread_id = ?1",
                    params![id],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?;
            let Some((messages, steps, updated_at)) = row else {
                return Ok(Checkpoint::empty(id));
            };
            let messages: Vec<Message> = serde_json::from_str(&messages)
                .map_err(|e| AgentError::Persistence(format!("decode {}: {}", id, e)))?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            Ok(Checkpoint {
                thread_id: id,
                messages,
                steps: steps.max(0) as usize,
                updated_at,
            })
        })
        .await
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), AgentError> {
        let messages = serde_json::to_string(&checkpoint.messages)
            .map_err(|e| AgentError::Persistence(e.to_string()))?;
        let id = checkpoint.thread_id.clone();
        let steps = checkpoint.steps as i64;
        let updated_at = checkpoint.updated_at.to_rfc3339();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (thread_id, messages, steps, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(thread_id) DO UPDATE SET
                    messages = excluded.messages,
                    steps = excluded.steps,
                    updated_at = excluded.updated_at",
                params![id, messages, steps, updated_at],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{History, MessageBody, ToolCallRequest};
    use tempfile::TempDir;

    fn sample_history() -> History {
        let mut h = History::new();
        h.append(MessageBody::system("seed"));
        h.append(MessageBody::user("hello"));
        h.append(MessageBody::assistant_with_calls(
            "",
            vec![ToolCallRequest::new(
                "call_1",
                "product_lookup",
                serde_json::json!({"query": "acne serum"}),
            )],
        ));
        h.append(MessageBody::Tool {
            call_id: "call_1".into(),
            name: "product_lookup".into(),
            content: "[]".into(),
        });
        h.append(MessageBody::assistant("done"));
        h
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store = SqliteCheckpointStore::open(dir.path().join("cp.db")).unwrap();
        let h = sample_history();
        store
            .put(&Checkpoint::new("thread-a", h.messages().to_vec(), 1))
            .await
            .unwrap();

        let cp = store.get("thread-a").await.unwrap();
        assert_eq!(cp.messages, h.messages());
        assert_eq!(cp.steps, 1);
    }

    #[tokio::test]
    async fn test_missing_thread_and_overwrite() {
        let store = SqliteCheckpointStore::open_in_memory().unwrap();
        assert!(store.get("missing").await.unwrap().is_empty());

        let h = sample_history();
        store
            .put(&Checkpoint::new("t", h.messages().to_vec(), 1))
            .await
            .unwrap();
        let mut short = History::new();
        short.append(MessageBody::user("only"));
        store
            .put(&Checkpoint::new("t", short.messages().to_vec(), 0))
            .await
            .unwrap();

        let cp = store.get("t").await.unwrap();
        assert_eq!(cp.messages.len(), 1);
        assert_eq!(cp.steps, 0);
    }

    #[tokio::test]
    async fn test_reopen_is_durable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.db");
        let h = sample_history();
        {
            let store = SqliteCheckpointStore::open(&path).unwrap();
            store
                .put(&Checkpoint::new("t", h.messages().to_vec(), 1))
                .await
                .unwrap();
        }
        let store = SqliteCheckpointStore::open(&path).unwrap();
        assert_eq!(store.get("t").await.unwrap().messages, h.messages());
    }
}
