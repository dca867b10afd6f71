//! 回合状态机的状态与策略

use serde::{Deserialize, Serialize};

/// 每次请求未配置时允许的 AGENT 轮数上限
pub const DEFAULT_RECURSION_LIMIT: usize = 15;

/// AGENT -> TOOLS -> AGENT -> ... -> END
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// 调用对话模型
    Agent,
    /// 执行上一条 assistant 回复中的全部工具调用
    Tools,
    /// 终态：写检查点并返回最终回复
    End,
}

/// 工具调用失败（含参数校验失败）时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailurePolicy {
    /// 中止整个请求，本轮已成功的工具结果一并丢弃
    #[default]
    Abort,
    /// 把错误作为工具结果交还模型，由模型决定重试或说明
    ReportToModel,
}
