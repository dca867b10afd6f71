//! 检查点存储：按线程 ID 持久化完整消息历史
//!
//! 契约：get 对未知线程返回空检查点而非错误；put 整体覆盖旧值、不做合并。
//! 存储不提供锁，同一线程的并发请求以后写者为准（丢失更新），需由调用方按线程串行化。

pub mod file;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::memory::Message;

pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// 某线程在最近一次提交时的消息序列与步数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub steps: usize,
    /// 仅供查看，不参与排序
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn empty(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            steps: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn new(thread_id: impl Into<String>, messages: Vec<Message>, steps: usize) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
            steps,
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// 检查点存储接口
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// 读取线程的检查点；不存在时返回空检查点
    async fn get(&self, thread_id: &str) -> Result<Checkpoint, AgentError>;

    /// 整体覆盖写入
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), AgentError>;
}
