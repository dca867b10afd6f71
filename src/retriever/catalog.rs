//! 向量产品目录
//!
//! 进程内保存 (产品摘要, 向量)，查询时对查询文本做嵌入并按余弦相似度排序。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::llm::EmbeddingProvider;
use crate::retriever::{cosine_similarity, rank, KnowledgeRetriever, RetrievalError, ScoredProduct};

struct Entry {
    summary: String,
    embedding: Vec<f32>,
}

/// 基于嵌入的产品目录
pub struct EmbeddingCatalog {
    entries: RwLock<Vec<Entry>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingCatalog {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder,
        }
    }

    /// 加入一条产品摘要；返回当前条目数
    pub async fn insert(&self, summary: impl Into<String>) -> Result<usize, RetrievalError> {
        let summary = summary.into();
        let embedding = self
            .embedder
            .embed(&summary)
            .await
            .map_err(RetrievalError::Embedding)?;
        if embedding.is_empty() {
            return Err(RetrievalError::Embedding("empty embedding".to_string()));
        }
        let mut entries = self.entries.write().await;
        entries.push(Entry { summary, embedding });
        Ok(entries.len())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KnowledgeRetriever for EmbeddingCatalog {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredProduct>, RetrievalError> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(RetrievalError::Embedding)?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let scored = entries
            .iter()
            .map(|e| ScoredProduct {
                summary: e.summary.clone(),
                score: cosine_similarity(&query_embedding, &e.embedding),
            })
            .filter(|p| p.score > 0.0)
            .collect();
        Ok(rank(scored, k))
    }
}
