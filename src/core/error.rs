//! Agent 错误类型
//!
//! 一次请求内出现的任何错误都会中止该请求并原样上抛，不做自动重试；
//! 本轮已经成功的工具结果随请求一起丢弃，检查点不会被写入。

use thiserror::Error;

/// 对话编排过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 问卷字段或图片载荷不合法
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// 对话模型或视觉模型调用失败
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    /// 工具参数未通过 schema 校验（含模型臆造的工具名）
    #[error("Tool validation failed: {0}")]
    ToolValidation(#[from] ToolValidationError),

    #[error("Tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    /// AGENT 轮次达到上限仍未得到最终回复
    #[error("Recursion limit of {limit} reached without a final answer")]
    RecursionLimitExceeded { limit: usize },

    /// 检查点读写失败
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn tool_execution(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// 错误类别的稳定名称，用于日志与对外的不透明失败信号
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::ModelInvocation(_) => "model_invocation",
            Self::ToolValidation(_) => "tool_validation",
            Self::ToolExecution { .. } => "tool_execution",
            Self::RecursionLimitExceeded { .. } => "recursion_limit_exceeded",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
        }
    }
}

/// 工具参数校验失败的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolValidationError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: malformed arguments: {reason}")]
    Malformed { tool: String, reason: String },

    #[error("{tool}: {reason}")]
    Constraint { tool: String, reason: String },
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            AgentError::RecursionLimitExceeded { limit: 15 }.kind(),
            "recursion_limit_exceeded"
        );
        let e: AgentError = ToolValidationError::UnknownTool("x".into()).into();
        assert_eq!(e.kind(), "tool_validation");
        assert_eq!(e.to_string(), "Tool validation failed: unknown tool: x");
    }
}
