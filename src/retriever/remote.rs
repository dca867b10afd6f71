//! 远程目录：调用外部相似度检索服务
//!
//! `POST {base_url}/search`，请求体 `{"query": ..., "k": ...}`，响应为 `[{"summary": ..., "score": ...}]`。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::retriever::{rank, KnowledgeRetriever, RetrievalError, ScoredProduct};

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    k: usize,
}

pub struct RemoteCatalog {
    client: Client,
    endpoint: String,
}

impl RemoteCatalog {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl KnowledgeRetriever for RemoteCatalog {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredProduct>, RetrievalError> {
        tracing::debug!(endpoint = %self.endpoint, k, "catalog search");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest { query, k })
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(format!("request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(RetrievalError::Backend(format!("HTTP {}", resp.status())));
        }
        let hits: Vec<ScoredProduct> = resp
            .json()
            .await
            .map_err(|e| RetrievalError::Backend(format!("decode: {}", e)))?;
        // 服务端未必遵守 k 与排序
        Ok(rank(hits, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let c = RemoteCatalog::new("http://localhost:8080/", 5).unwrap();
        assert_eq!(c.endpoint(), "http://localhost:8080/search");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let c = RemoteCatalog::new("http://127.0.0.1:9", 1).unwrap();
        assert!(matches!(
            c.search("acne", 4).await,
            Err(RetrievalError::Backend(_))
        ));
    }
}
