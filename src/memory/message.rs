//! 对话消息
//!
//! 消息体是带标签的联合：system / user / assistant（可携带工具调用请求）/ tool（工具结果）。
//! 每条消息入史时获得单调递增的 seq，顺序是唯一的排序依据。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 模型发出的一次工具调用请求；id 用于与结果对应
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// 一次工具调用的序列化输出，只被下一个 AGENT 轮次消费
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub output: String,
}

/// 消息体
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum MessageBody {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl MessageBody {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. } => content,
        }
    }

    /// assistant 消息携带的工具调用；其他角色恒为空
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

impl From<ToolCallResult> for MessageBody {
    fn from(r: ToolCallResult) -> Self {
        Self::Tool {
            call_id: r.call_id,
            name: r.name,
            content: r.output,
        }
    }
}

/// 已提交的消息：序号 + 消息体，提交后不再修改
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub seq: u64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn role(&self) -> Role {
        self.body.role()
    }

    pub fn content(&self) -> &str {
        self.body.content()
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        self.body.tool_calls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_shape() {
        let msg = Message {
            seq: 3,
            body: MessageBody::assistant_with_calls(
                "",
                vec![ToolCallRequest::new(
                    "call_1",
                    "product_lookup",
                    serde_json::json!({"query": "acne serum"}),
                )],
            ),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["seq"], 3);
        assert_eq!(v["role"], "assistant");
        assert_eq!(v["tool_calls"][0]["name"], "product_lookup");

        let back: Message = serde_json::from_value(v).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_plain_assistant_omits_tool_calls() {
        let v = serde_json::to_value(MessageBody::assistant("hi")).unwrap();
        assert!(v.get("tool_calls").is_none());
        let back: MessageBody = serde_json::from_value(v).unwrap();
        assert!(back.tool_calls().is_empty());
    }

    #[test]
    fn test_tool_result_into_body() {
        let body: MessageBody = ToolCallResult {
            call_id: "c1".into(),
            name: "product_lookup".into(),
            output: "[]".into(),
        }
        .into();
        assert_eq!(body.role(), Role::Tool);
        assert_eq!(body.content(), "[]");
    }
}
