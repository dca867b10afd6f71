//! 回合过程事件：供调用方流式展示步数、工具调用、观察与最终回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 即将进入第 step 个 AGENT 轮次（从 0 计）
    StepUpdate { step: usize, max_steps: usize },
    /// 模型请求调用工具
    ToolCall {
        id: String,
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation {
        id: String,
        tool: String,
        preview: String,
    },
    /// 工具失败
    ToolFailure { tool: String, reason: String },
    /// 本次请求消耗的 token（增量）与模型累计值
    TokenUsage {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
        cumulative_total: u64,
    },
    /// 最终回复
    Answer { text: String },
    Error { text: String },
}
