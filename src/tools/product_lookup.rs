//! product_lookup 工具：把知识检索接入工具调用
//!
//! 参数 `{query: string, n: integer = 4}`；输出为排名列表的 JSON 数组。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ToolValidationError;
use crate::retriever::KnowledgeRetriever;
use crate::tools::schema::{self, ToolArgs, ValidatedArgs};
use crate::tools::Tool;

pub const PRODUCT_LOOKUP: &str = "product_lookup";
pub const DEFAULT_N: u32 = 4;
pub const MAX_N: u32 = 20;

fn default_n() -> u32 {
    DEFAULT_N
}

/// product_lookup 的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProductLookupArgs {
    /// 自然语言描述的产品需求，如 "gentle acne serum for oily skin"
    pub query: String,
    /// 返回的产品条数
    #[serde(default = "default_n")]
    pub n: u32,
}

impl ToolArgs for ProductLookupArgs {
    fn check(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.n == 0 || self.n > MAX_N {
            return Err(format!("n must be between 1 and {}", MAX_N));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RankedEntry<'a> {
    rank: usize,
    summary: &'a str,
    score: f32,
}

pub struct ProductLookupTool {
    retriever: Arc<dyn KnowledgeRetriever>,
}

impl ProductLookupTool {
    pub fn new(retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for ProductLookupTool {
    fn name(&self) -> &str {
        PRODUCT_LOOKUP
    }

    fn description(&self) -> &str {
        "Search the skincare product catalog. Returns the most relevant products ranked by similarity, each with a short summary and a score."
    }

    fn parameters_schema(&self) -> Value {
        schema::parameters_schema::<ProductLookupArgs>()
    }

    fn validate(&self, args: &Value) -> Result<ValidatedArgs, ToolValidationError> {
        let typed: ProductLookupArgs = schema::validate(PRODUCT_LOOKUP, args)?;
        ValidatedArgs::from_typed(&typed).map_err(|reason| ToolValidationError::Malformed {
            tool: PRODUCT_LOOKUP.to_string(),
            reason,
        })
    }

    async fn execute(&self, args: ValidatedArgs) -> Result<String, String> {
        let args: ProductLookupArgs = args.into_typed()?;
        tracing::info!(query = %args.query, n = args.n, "product lookup");
        let hits = self
            .retriever
            .search(&args.query, args.n as usize)
            .await
            .map_err(|e| e.to_string())?;
        let ranked: Vec<RankedEntry<'_>> = hits
            .iter()
            .take(args.n as usize)
            .enumerate()
            .map(|(i, h)| RankedEntry {
                rank: i + 1,
                summary: &h.summary,
                score: h.score,
            })
            .collect();
        serde_json::to_string(&ranked).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::{RetrievalError, ScoredProduct, StaticCatalog};
    use serde_json::json;
    use std::sync::Mutex;

    /// 记录收到的 k，返回 k+2 条结果
    #[derive(Default)]
    struct RecordingRetriever {
        seen_k: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl KnowledgeRetriever for RecordingRetriever {
        async fn search(&self, _q: &str, k: usize) -> Result<Vec<ScoredProduct>, RetrievalError> {
            self.seen_k.lock().unwrap().push(k);
            Ok((0..k + 2)
                .map(|i| ScoredProduct {
                    summary: format!("p{}", i),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect())
        }
    }

    struct BrokenRetriever;

    #[async_trait]
    impl KnowledgeRetriever for BrokenRetriever {
        async fn search(&self, _q: &str, _k: usize) -> Result<Vec<ScoredProduct>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".into()))
        }
    }

    #[tokio::test]
    async fn test_n_defaults_to_four() {
        let retriever = Arc::new(RecordingRetriever::default());
        let tool = ProductLookupTool::new(retriever.clone());
        let args = tool.validate(&json!({"query": "acne serum"})).unwrap();
        assert_eq!(args.as_value()["n"], 4);

        let out = tool.execute(args).await.unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0]["rank"], 1);
        assert_eq!(parsed[0]["summary"], "p0");
        assert_eq!(*retriever.seen_k.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_validation_failures() {
        let tool = ProductLookupTool::new(Arc::new(StaticCatalog::default()));
        assert!(matches!(
            tool.validate(&json!({"n": 3})),
            Err(ToolValidationError::Malformed { .. })
        ));
        assert!(matches!(
            tool.validate(&json!({"query": "  "})),
            Err(ToolValidationError::Constraint { .. })
        ));
        assert!(matches!(
            tool.validate(&json!({"query": "spf", "n": 0})),
            Err(ToolValidationError::Constraint { .. })
        ));
        assert!(matches!(
            tool.validate(&json!({"query": "spf", "n": "four"})),
            Err(ToolValidationError::Malformed { .. })
        ));
        assert!(matches!(
            tool.validate(&json!({"query": "spf", "limit": 2})),
            Err(ToolValidationError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_retriever_failure_surfaces() {
        let tool = ProductLookupTool::new(Arc::new(BrokenRetriever));
        let args = tool.validate(&json!({"query": "spf"})).unwrap();
        let err = tool.execute(args).await.unwrap_err();
        assert!(err.contains("index offline"));
    }

    #[tokio::test]
    async fn test_retriever_failure_becomes_tool_execution_error() {
        use crate::core::AgentError;
        use crate::memory::ToolCallRequest;
        use crate::tools::{ToolExecutor, ToolSet};

        let exec = ToolExecutor::new(
            ToolSet::new().with(ProductLookupTool::new(Arc::new(BrokenRetriever))),
            5,
        );
        let err = exec
            .execute(&ToolCallRequest::new("c1", "product_lookup", json!({"query": "spf"})))
            .await
            .unwrap_err();
        match err {
            AgentError::ToolExecution { tool, reason } => {
                assert_eq!(tool, "product_lookup");
                assert!(reason.contains("index offline"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_declared_schema() {
        let tool = ProductLookupTool::new(Arc::new(StaticCatalog::default()));
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["n"]["default"], 4);
    }
}
