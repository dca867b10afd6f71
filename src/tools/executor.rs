//! 工具执行器
//!
//! 持有 ToolSet 与单次调用超时：先校验参数再执行，超时或失败时转为 AgentError；
//! 每次调用输出结构化审计日志（JSON）。同一 TOOLS 轮内的多个调用并发执行，结果按请求顺序返回。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::core::{AgentError, ToolValidationError};
use crate::memory::{ToolCallRequest, ToolCallResult};
use crate::tools::schema::ValidatedArgs;
use crate::tools::{Tool, ToolDeclaration, ToolSet};

/// 工具执行器：校验、并发限制、超时、审计
pub struct ToolExecutor {
    tools: ToolSet,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ToolExecutor {
    /// timeout_secs 至少按 1 秒计，0 会让每次调用立即超时
    pub fn new(tools: ToolSet, timeout_secs: u64) -> Self {
        Self {
            tools,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            permits: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
        }
    }

    /// 限制同时在途的工具调用数（默认不限）
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_parallel.max(1)));
        self
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.declarations()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.tool_names()
    }

    /// 纯校验：工具是否存在、参数是否符合声明
    pub fn validate(
        &self,
        call: &ToolCallRequest,
    ) -> Result<(Arc<dyn Tool>, ValidatedArgs), ToolValidationError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolValidationError::UnknownTool(call.name.clone()))?;
        let args = tool.validate(&call.arguments)?;
        Ok((tool, args))
    }

    /// 执行单个调用；校验失败为 ToolValidation，执行失败或超时为 ToolExecution
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<ToolCallResult, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&call.arguments);

        let result = match self.validate(call) {
            Err(e) => Err(AgentError::from(e)),
            Ok((tool, args)) => {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| AgentError::tool_execution(&call.name, e))?;
                match timeout(self.timeout, tool.execute(args)).await {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(reason)) => Err(AgentError::tool_execution(&call.name, reason)),
                    Err(_) => Err(AgentError::tool_execution(
                        &call.name,
                        format!("timed out after {}s", self.timeout.as_secs()),
                    )),
                }
            }
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AgentError::ToolValidation(_)) => "invalid",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.id,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result.map(|output| ToolCallResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            output,
        })
    }

    /// 并发执行一批调用，全部完成后按请求顺序返回
    pub async fn execute_all(
        &self,
        calls: &[ToolCallRequest],
    ) -> Vec<Result<ToolCallResult, AgentError>> {
        join_all(calls.iter().map(|c| self.execute(c))).await
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
