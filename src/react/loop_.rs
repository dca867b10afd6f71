//! 回合执行器：AGENT / TOOLS / END 状态机
//!
//! 入口：读检查点（未知线程即空历史）-> 追加本次消息 -> AGENT。
//! AGENT 调模型并追加回复；有工具调用进入 TOOLS，否则 END。
//! TOOLS 并发执行全部调用，全部完成后按请求顺序追加结果，steps + 1 回到 AGENT。
//! END 把完整历史整体写回检查点。任何错误都中止请求且不写检查点。

use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::core::AgentError;
use crate::llm::ChatModel;
use crate::memory::{History, Message, MessageBody, ToolCallRequest};
use crate::react::{ReactEvent, ToolFailurePolicy, TurnState, DEFAULT_RECURSION_LIMIT};
use crate::tools::ToolExecutor;

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次请求的执行结果
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub thread_id: String,
    /// 最终 assistant 消息的文本
    pub response: String,
    /// 本次请求完成的 TOOLS 轮数
    pub steps: usize,
    /// 提交后的完整历史
    pub messages: Vec<Message>,
    /// 本次请求新增消息在 messages 中的起始下标
    pub first_new: usize,
}

impl TurnOutcome {
    pub fn new_messages(&self) -> &[Message] {
        &self.messages[self.first_new..]
    }
}

/// 回合执行器：模型、工具、存储都以引用传入，便于用替身测试
pub struct TurnExecutor<'a> {
    model: &'a dyn ChatModel,
    tools: &'a ToolExecutor,
    store: &'a dyn CheckpointStore,
    recursion_limit: usize,
    failure_policy: ToolFailurePolicy,
    event_tx: Option<&'a UnboundedSender<ReactEvent>>,
}

impl<'a> TurnExecutor<'a> {
    pub fn new(
        model: &'a dyn ChatModel,
        tools: &'a ToolExecutor,
        store: &'a dyn CheckpointStore,
    ) -> Self {
        Self {
            model,
            tools,
            store,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            failure_policy: ToolFailurePolicy::Abort,
            event_tx: None,
        }
    }

    /// 上限至少为 1
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, ev: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    /// 加载线程历史、追加新消息、跑状态机，成功后提交检查点
    pub async fn run(
        &self,
        thread_id: &str,
        new_messages: Vec<MessageBody>,
    ) -> Result<TurnOutcome, AgentError> {
        let span = tracing::info_span!("turn", thread_id = %thread_id);
        async move {
            let checkpoint = self.store.get(thread_id).await?;
            if checkpoint.is_empty() {
                tracing::debug!("no checkpoint, starting fresh history");
            }
            let mut history = History::from_messages(checkpoint.messages)?;
            let first_new = history.len();
            history.extend(new_messages);

            // 记录初始 token 数，用于计算本次增量
            let (init_prompt, init_completion, _) = self.model.token_usage();

            let (response, steps) = match self.drive(&mut history).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(kind = e.kind(), error = %e, "turn aborted");
                    self.send_event(ReactEvent::Error { text: e.to_string() });
                    return Err(e);
                }
            };

            let messages = history.into_messages();
            self.store
                .put(&Checkpoint::new(thread_id, messages.clone(), steps))
                .await?;
            let (cur_prompt, cur_completion, cur_total) = self.model.token_usage();
            let prompt_tokens = cur_prompt.saturating_sub(init_prompt);
            let completion_tokens = cur_completion.saturating_sub(init_completion);
            self.send_event(ReactEvent::TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                cumulative_total: cur_total,
            });
            tracing::info!(
                steps,
                messages = messages.len(),
                prompt_tokens,
                completion_tokens,
                "turn committed"
            );

            Ok(TurnOutcome {
                thread_id: thread_id.to_string(),
                response,
                steps,
                messages,
                first_new,
            })
        }
        .instrument(span)
        .await
    }

    /// 纯状态机：只追加 history，不读写检查点；返回 (最终回复, steps)
    pub async fn drive(&self, history: &mut History) -> Result<(String, usize), AgentError> {
        let declarations = self.tools.declarations();
        let mut state = TurnState::Agent;
        let mut steps = 0usize;

        loop {
            match state {
                TurnState::Agent => {
                    debug_assert!(history.pending_tool_calls().is_empty());
                    self.send_event(ReactEvent::StepUpdate {
                        step: steps,
                        max_steps: self.recursion_limit,
                    });
                    let reply = self
                        .model
                        .invoke(history.messages(), &declarations)
                        .await
                        .map_err(AgentError::ModelInvocation)?;
                    tracing::debug!(step = steps, tool_calls = reply.tool_calls.len(), "agent reply");

                    state = if reply.wants_tools() {
                        TurnState::Tools
                    } else {
                        TurnState::End
                    };
                    history.append(MessageBody::assistant_with_calls(reply.content, reply.tool_calls));
                }
                TurnState::Tools => {
                    // 第 recursion_limit 次 AGENT 仍要调工具：不再执行，直接中止
                    if steps + 1 >= self.recursion_limit {
                        return Err(AgentError::RecursionLimitExceeded {
                            limit: self.recursion_limit,
                        });
                    }
                    let calls: Vec<ToolCallRequest> = history
                        .last()
                        .map(|m| m.tool_calls().to_vec())
                        .unwrap_or_default();
                    let results = self.run_tools(&calls).await?;
                    history.extend(results);
                    steps += 1;
                    state = TurnState::Agent;
                }
                TurnState::End => {
                    let response = history
                        .last()
                        .map(|m| m.content().to_string())
                        .unwrap_or_default();
                    self.send_event(ReactEvent::Answer {
                        text: response.clone(),
                    });
                    return Ok((response, steps));
                }
            }
        }
    }

    /// 一个 TOOLS 轮：并发执行，按请求顺序产出一条 tool 消息/请求
    async fn run_tools(&self, calls: &[ToolCallRequest]) -> Result<Vec<MessageBody>, AgentError> {
        for c in calls {
            self.send_event(ReactEvent::ToolCall {
                id: c.id.clone(),
                tool: c.name.clone(),
                args: c.arguments.clone(),
            });
        }

        let results = self.tools.execute_all(calls).await;

        let mut bodies = Vec::with_capacity(calls.len());
        for (call, result) in calls.iter().zip(results) {
            let content = match result {
                Ok(r) => r.output,
                Err(e) => {
                    self.send_event(ReactEvent::ToolFailure {
                        tool: call.name.clone(),
                        reason: e.to_string(),
                    });
                    match self.failure_policy {
                        ToolFailurePolicy::Abort => return Err(e),
                        ToolFailurePolicy::ReportToModel => format!("Error: {}", e),
                    }
                }
            };
            self.send_event(ReactEvent::Observation {
                id: call.id.clone(),
                tool: call.name.clone(),
                preview: preview(&content),
            });
            bodies.push(MessageBody::Tool {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content,
            });
        }
        Ok(bodies)
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", s.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}
