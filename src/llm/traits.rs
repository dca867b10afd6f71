//! LLM 客户端抽象
//!
//! 对话模型：给定完整历史与工具声明，返回一条 assistant 回复（文本 + 可选工具调用）。
//! 视觉模型：给定 system 指令与带图片的 user 消息，返回一段分析文本。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ImageInput;
use crate::memory::{Message, ToolCallRequest};
use crate::tools::ToolDeclaration;

/// 对话模型的一次回复
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// 对话模型
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        history: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, String>;

    /// 累计 token 使用：(prompt, completion, total)；默认不统计
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 视觉模型（只在新会话带图片时调用一次）
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn analyze(
        &self,
        system: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, String>;
}
