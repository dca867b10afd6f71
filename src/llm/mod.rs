//! LLM 层：对话 / 视觉模型抽象与实现（OpenAI 兼容 / Mock）、嵌入

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod traits;

pub use embedding::{create_embedder_from_config, EmbeddingProvider, OpenAiEmbedder};
pub use mock::{MockChatModel, MockVisionModel, ScriptedChatModel};
pub use openai::OpenAiClient;
pub use traits::{AssistantReply, ChatModel, TokenUsage, VisionModel};
