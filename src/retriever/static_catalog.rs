//! 静态目录：固定条目 + 词重叠打分（离线演示与测试用）

use std::collections::HashSet;

use async_trait::async_trait;

use crate::retriever::{rank, KnowledgeRetriever, RetrievalError, ScoredProduct};

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<String>,
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

impl StaticCatalog {
    pub fn new<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
        }
    }

    /// 内置的小型演示目录
    pub fn demo() -> Self {
        Self::new([
            "Clarifying Salicylic Acid Serum 2% - unclogs pores, targets acne, suited to oily skin",
            "Niacinamide 10% + Zinc Serum - reduces blemishes and excess oil",
            "Oil-Free Gel Moisturizer - lightweight hydration for oily and acne-prone skin",
            "Mineral Sunscreen SPF 50 - non-comedogenic daily protection",
            "Ceramide Repair Cream - restores barrier for dry, sensitive skin",
            "Gentle Foaming Cleanser - low pH, fragrance free",
        ])
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticCatalog {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredProduct>, RetrievalError> {
        let q = tokens(query);
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let scored = self
            .products
            .iter()
            .filter_map(|p| {
                let hits = tokens(p).intersection(&q).count();
                (hits > 0).then(|| ScoredProduct {
                    summary: p.clone(),
                    score: hits as f32 / q.len() as f32,
                })
            })
            .collect();
        Ok(rank(scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_catalog_search() {
        let hits = StaticCatalog::demo().search("acne serum", 4).await.unwrap();
        assert!(!hits.is_empty() && hits.len() <= 4);
        assert!(hits[0].summary.contains("Salicylic"));
        assert!((hits[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_no_overlap_is_empty() {
        let hits = StaticCatalog::demo().search("shampoo", 4).await.unwrap();
        assert!(hits.is_empty());
    }
}
