//! 文件检查点存储
//!
//! 每个线程一个 JSON 文件；先写临时文件再 rename，读到的永远是完整的一次提交。
//! 文件名是线程 ID 的 URL-safe base64，不同 ID 不会落到同一文件。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tokio::io::AsyncWriteExt;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::core::AgentError;

#[derive(Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(thread_id.as_bytes())))
    }
}

fn io_err(e: impl std::fmt::Display) -> AgentError {
    AgentError::Persistence(e.to_string())
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self, thread_id: &str) -> Result<Checkpoint, AgentError> {
        let path = self.path_for(thread_id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Checkpoint::empty(thread_id));
            }
            Err(e) => return Err(io_err(e)),
        };
        let cp: Checkpoint = serde_json::from_str(&data).map_err(io_err)?;
        if cp.thread_id != thread_id {
            return Err(AgentError::Persistence(format!(
                "{} holds thread {}",
                path.display(),
                cp.thread_id
            )));
        }
        Ok(cp)
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), AgentError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.path_for(&checkpoint.thread_id);
        let data = serde_json::to_string_pretty(checkpoint).map_err(io_err)?;

        // 每次写入独立的临时文件，并发 put 同一线程时后 rename 者胜出
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            URL_SAFE_NO_PAD.encode(checkpoint.thread_id.as_bytes()),
            uuid::Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(data.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        Ok(())
    }
}
