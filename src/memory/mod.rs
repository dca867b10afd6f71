//! 记忆层：消息模型与追加式对话历史

pub mod history;
pub mod message;

pub use history::History;
pub use message::{Message, MessageBody, Role, ToolCallRequest, ToolCallResult};
