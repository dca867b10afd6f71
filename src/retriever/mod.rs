//! 知识检索：产品目录的相似度搜索
//!
//! 索引的构建不在本 crate 内；这里只定义检索接口，并提供向量目录、远程目录与静态目录三种实现。

pub mod catalog;
pub mod remote;
pub mod static_catalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::EmbeddingCatalog;
pub use remote::RemoteCatalog;
pub use static_catalog::StaticCatalog;

/// 一条检索结果：产品摘要与相似度
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub summary: String,
    pub score: f32,
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("search backend failed: {0}")]
    Backend(String),
}

/// 检索接口：按相关度降序返回至多 k 条
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredProduct>, RetrievalError>;
}

/// 余弦相似度
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// 按分数降序排序并截断到 k
pub(crate) fn rank(mut scored: Vec<ScoredProduct>, k: usize) -> Vec<ScoredProduct> {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
