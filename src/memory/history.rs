//! 追加式对话历史
//!
//! 合并语义就是拼接：只能 append，不能替换、删除或重排。

use crate::core::AgentError;
use crate::memory::{Message, MessageBody, ToolCallRequest};

/// 一个线程的完整消息日志
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从检查点恢复；要求 seq 从 0 开始连续，否则视为损坏的检查点
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, AgentError> {
        for (i, m) in messages.iter().enumerate() {
            if m.seq != i as u64 {
                return Err(AgentError::Persistence(format!(
                    "checkpoint out of order: expected seq {}, found {}",
                    i, m.seq
                )));
            }
        }
        Ok(Self { messages })
    }

    /// 追加一条消息并分配下一个序号
    pub fn append(&mut self, body: MessageBody) -> &Message {
        let seq = self.messages.len() as u64;
        self.messages.push(Message { seq, body });
        &self.messages[self.messages.len() - 1]
    }

    pub fn extend(&mut self, bodies: impl IntoIterator<Item = MessageBody>) {
        for body in bodies {
            self.append(body);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 最近一条 assistant 消息中尚未得到结果的工具调用
    pub fn pending_tool_calls(&self) -> Vec<ToolCallRequest> {
        let Some(idx) = self
            .messages
            .iter()
            .rposition(|m| matches!(m.body, MessageBody::Assistant { .. }))
        else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(|m| match &m.body {
                MessageBody::Tool { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();
        self.messages[idx]
            .tool_calls()
            .iter()
            .filter(|c| !answered.contains(&c.id.as_str()))
            .cloned()
            .collect()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_assigns_monotonic_seq() {
        let mut h = History::new();
        h.append(MessageBody::system("s"));
        h.append(MessageBody::user("u"));
        let last = h.append(MessageBody::assistant("a"));
        assert_eq!(last.seq, 2);
        let seqs: Vec<u64> = h.messages().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_append_preserves_prefix() {
        let mut h = History::new();
        h.extend([MessageBody::user("one"), MessageBody::assistant("two")]);
        let before = h.messages().to_vec();
        h.append(MessageBody::user("three"));
        assert_eq!(&h.messages()[..before.len()], before.as_slice());
    }

    #[test]
    fn test_from_messages_rejects_gaps() {
        let mut h = History::new();
        h.extend([MessageBody::user("a"), MessageBody::assistant("b")]);
        let mut msgs = h.into_messages();
        msgs.remove(0);
        assert!(matches!(
            History::from_messages(msgs),
            Err(AgentError::Persistence(_))
        ));
    }

    #[test]
    fn test_pending_tool_calls() {
        let mut h = History::new();
        h.append(MessageBody::assistant_with_calls(
            "",
            vec![
                ToolCallRequest::new("c1", "product_lookup", json!({"query": "a"})),
                ToolCallRequest::new("c2", "product_lookup", json!({"query": "b"})),
            ],
        ));
        assert_eq!(h.pending_tool_calls().len(), 2);
        h.append(MessageBody::Tool {
            call_id: "c1".into(),
            name: "product_lookup".into(),
            content: "[]".into(),
        });
        let pending = h.pending_tool_calls();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "c2");
    }
}
