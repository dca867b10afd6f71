//! Mock 模型（用于测试与无 API Key 的本地演示）
//!
//! - MockChatModel：收到用户消息时请求一次 product_lookup，拿到工具结果后给出最终回复
//! - ScriptedChatModel：按脚本依次返回预设回复，记录每次调用看到的历史
//! - MockVisionModel：返回固定分析文本或固定错误

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::context::ImageInput;
use crate::llm::{AssistantReply, ChatModel, TokenUsage, VisionModel};
use crate::memory::{Message, MessageBody, ToolCallRequest};
use crate::tools::ToolDeclaration;

/// 离线演示用：先查一次目录，再回显工具结果
#[derive(Debug, Default)]
pub struct MockChatModel;

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(
        &self,
        history: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, String> {
        match history.last().map(|m| &m.body) {
            Some(MessageBody::Tool { content, .. }) => Ok(AssistantReply::text(format!(
                "Mock advisor found these products: {}",
                content
            ))),
            Some(MessageBody::User { content }) if tools.iter().any(|t| t.name == "product_lookup") => {
                let query: String = content.chars().take(120).collect();
                Ok(AssistantReply::calls(vec![ToolCallRequest::new(
                    format!("mock_call_{}", history.len()),
                    "product_lookup",
                    json!({ "query": query }),
                )]))
            }
            _ => Ok(AssistantReply::text("(no input)")),
        }
    }
}

enum Script {
    Queue(VecDeque<Result<AssistantReply, String>>),
    Forever(AssistantReply),
}

/// 脚本化对话模型：测试中驱动状态机的每一步
pub struct ScriptedChatModel {
    script: Mutex<Script>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
    usage: TokenUsage,
    per_call: (u64, u64),
}

impl ScriptedChatModel {
    pub fn new(replies: Vec<AssistantReply>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    /// 允许在脚本中穿插失败
    pub fn with_results(results: Vec<Result<AssistantReply, String>>) -> Self {
        Self {
            script: Mutex::new(Script::Queue(results.into())),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            usage: TokenUsage::new(),
            per_call: (0, 0),
        }
    }

    /// 每次都返回同一条回复（用于构造永不结束的工具循环）
    pub fn forever(reply: AssistantReply) -> Self {
        Self {
            script: Mutex::new(Script::Forever(reply)),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            usage: TokenUsage::new(),
            per_call: (0, 0),
        }
    }

    /// 每次调用按固定的 (prompt, completion) 计 token
    pub fn with_usage_per_call(mut self, prompt: u64, completion: u64) -> Self {
        self.per_call = (prompt, completion);
        self
    }

    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用时模型看到的完整历史
    pub fn seen_histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn invoke(
        &self,
        history: &[Message],
        _tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.usage.add(self.per_call.0, self.per_call.1);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(history.to_vec());
        }
        let mut script = self.script.lock().map_err(|_| "script poisoned".to_string())?;
        match &mut *script {
            Script::Queue(q) => q
                .pop_front()
                .unwrap_or_else(|| Err(format!("script exhausted after {} replies", n))),
            Script::Forever(reply) => {
                let mut reply = reply.clone();
                for (i, call) in reply.tool_calls.iter_mut().enumerate() {
                    call.id = format!("{}_{}_{}", call.id, n, i);
                }
                Ok(reply)
            }
        }
    }
}

/// 视觉模型替身
pub struct MockVisionModel {
    outcome: Result<String, String>,
    calls: AtomicUsize,
}

impl MockVisionModel {
    pub fn new(analysis: impl Into<String>) -> Self {
        Self {
            outcome: Ok(analysis.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockVisionModel {
    fn default() -> Self {
        Self::new("Mock analysis: even skin tone, mild redness around the nose.")
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn analyze(
        &self,
        _system: &str,
        _prompt: &str,
        _image: &ImageInput,
    ) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
