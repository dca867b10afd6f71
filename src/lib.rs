//! Glow - 有状态、可调用工具的护肤顾问对话编排引擎
//!
//! 模块划分：
//! - **agent**: 对话服务（StartConversation / ContinueConversation）
//! - **checkpoint**: 按线程 ID 持久化对话历史（内存 / SQLite / JSON 文件）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **context**: 用户画像、图片输入与种子上下文组装
//! - **core**: 错误类型
//! - **llm**: 对话模型 / 视觉模型 / Embedding 抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 消息类型与只追加的对话历史
//! - **react**: AGENT / TOOLS / END 回合状态机
//! - **retriever**: 产品目录检索（向量 / 远程服务 / 内置目录）
//! - **tools**: 工具声明、参数校验与并发执行器，product_lookup 工具

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod retriever;
pub mod tools;

pub use agent::{ContinueResponse, ConversationService, StartResponse};
pub use core::AgentError;
