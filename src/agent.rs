//! Headless 对话服务
//!
//! 两个对外操作：
//! - start_conversation：生成新线程 ID，组装种子上下文，跑回合执行器
//! - continue_conversation：读取线程历史，追加一条用户消息，跑回合执行器
//!
//! 模型、工具集、检查点存储都在构建时创建一次，之后每个请求以引用借用。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::checkpoint::{
    CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore,
};
use crate::config::{AppConfig, CheckpointBackend, RetrieverBackend};
use crate::context::{ContextAssembler, ImageInput, UserProfile};
use crate::core::AgentError;
use crate::llm::{
    create_embedder_from_config, ChatModel, EmbeddingProvider, MockChatModel, MockVisionModel,
    OpenAiClient, VisionModel,
};
use crate::memory::{Message, MessageBody};
use crate::react::{ReactEvent, ToolFailurePolicy, TurnExecutor, TurnOutcome, DEFAULT_RECURSION_LIMIT};
use crate::retriever::{EmbeddingCatalog, KnowledgeRetriever, RemoteCatalog, StaticCatalog};
use crate::tools::{ProductLookupTool, ToolExecutor, ToolSet};

/// StartConversation 的结果
#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub thread_id: String,
    pub response: String,
}

/// ContinueConversation 的结果
#[derive(Debug, Clone, Serialize)]
pub struct ContinueResponse {
    pub response: String,
}

/// 新线程 ID：随机 UUID，不依赖时钟
pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct ConversationService {
    chat: Arc<dyn ChatModel>,
    assembler: ContextAssembler,
    tools: ToolExecutor,
    store: Arc<dyn CheckpointStore>,
    recursion_limit: usize,
    failure_policy: ToolFailurePolicy,
    max_image_bytes: usize,
}

impl ConversationService {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        assembler: ContextAssembler,
        tools: ToolExecutor,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            chat,
            assembler,
            tools,
            store,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            failure_policy: ToolFailurePolicy::Abort,
            max_image_bytes: crate::context::DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    /// 按配置构建：模型、产品目录、工具集、检查点存储
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let (chat, vision) = create_models_from_config(cfg);

        let retriever = create_retriever_from_config(cfg).await?;
        let tools = ToolExecutor::new(
            ToolSet::new().with(ProductLookupTool::new(retriever)),
            cfg.tools.tool_timeout_secs,
        )
        .with_max_parallel(cfg.tools.max_parallel);
        tracing::info!(tools = ?tools.tool_names(), "tool set ready");

        let mut assembler = ContextAssembler::new(Some(vision));
        if let Some(path) = &cfg.llm.advisor_prompt_path {
            assembler = assembler.with_advisor_prompt(read_prompt(path).await?);
        }
        if let Some(path) = &cfg.llm.vision_prompt_path {
            assembler = assembler.with_vision_system_prompt(read_prompt(path).await?);
        }

        let store = create_store_from_config(cfg)?;

        Ok(Self::new(chat, assembler, tools, store)
            .with_recursion_limit(cfg.agent.recursion_limit)
            .with_failure_policy(cfg.agent.tool_failure_policy)
            .with_max_image_bytes(cfg.image.max_bytes))
    }

    /// 校验原始图片字节（mime 可省略，按魔数识别）
    pub fn image_from_bytes(&self, bytes: Vec<u8>, mime: Option<&str>) -> Result<ImageInput, AgentError> {
        ImageInput::new(bytes, mime, self.max_image_bytes)
    }

    pub async fn start_conversation(
        &self,
        profile: &UserProfile,
        image: Option<&ImageInput>,
    ) -> Result<StartResponse, AgentError> {
        self.start_inner(profile, image, None).await
    }

    /// 同 start_conversation，并通过 event_tx 推送过程事件
    pub async fn start_conversation_stream(
        &self,
        profile: &UserProfile,
        image: Option<&ImageInput>,
        event_tx: &UnboundedSender<ReactEvent>,
    ) -> Result<StartResponse, AgentError> {
        self.start_inner(profile, image, Some(event_tx)).await
    }

    pub async fn continue_conversation(
        &self,
        thread_id: &str,
        message: &str,
    ) -> Result<ContinueResponse, AgentError> {
        self.continue_inner(thread_id, message, None).await
    }

    pub async fn continue_conversation_stream(
        &self,
        thread_id: &str,
        message: &str,
        event_tx: &UnboundedSender<ReactEvent>,
    ) -> Result<ContinueResponse, AgentError> {
        self.continue_inner(thread_id, message, Some(event_tx)).await
    }

    /// 线程已提交的历史（未知线程为空）
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, AgentError> {
        Ok(self.store.get(thread_id).await?.messages)
    }

    async fn start_inner(
        &self,
        profile: &UserProfile,
        image: Option<&ImageInput>,
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<StartResponse, AgentError> {
        let seed = self.assembler.assemble(profile, image).await?;
        let thread_id = new_thread_id();
        tracing::info!(thread_id = %thread_id, has_image = image.is_some(), "start conversation");
        let outcome = self.run(&thread_id, seed.messages, event_tx).await?;
        Ok(StartResponse {
            thread_id: outcome.thread_id,
            response: outcome.response,
        })
    }

    async fn continue_inner(
        &self,
        thread_id: &str,
        message: &str,
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<ContinueResponse, AgentError> {
        if thread_id.trim().is_empty() {
            return Err(AgentError::InputValidation("thread id is empty".to_string()));
        }
        if message.trim().is_empty() {
            return Err(AgentError::InputValidation("message is empty".to_string()));
        }
        tracing::info!(thread_id = %thread_id, "continue conversation");
        let outcome = self
            .run(thread_id, vec![MessageBody::user(message)], event_tx)
            .await?;
        Ok(ContinueResponse {
            response: outcome.response,
        })
    }

    async fn run(
        &self,
        thread_id: &str,
        messages: Vec<MessageBody>,
        event_tx: Option<&UnboundedSender<ReactEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let mut executor = TurnExecutor::new(self.chat.as_ref(), &self.tools, self.store.as_ref())
            .with_recursion_limit(self.recursion_limit)
            .with_failure_policy(self.failure_policy);
        if let Some(tx) = event_tx {
            executor = executor.with_event_tx(tx);
        }
        executor.run(thread_id, messages).await
    }
}

async fn read_prompt(path: &std::path::Path) -> Result<String, AgentError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AgentError::Config(format!("prompt {}: {}", path.display(), e)))
}

/// 有 OPENAI_API_KEY 且 provider 不是 mock 时走 OpenAI 兼容端点，否则用 Mock 模型
pub fn create_models_from_config(cfg: &AppConfig) -> (Arc<dyn ChatModel>, Arc<dyn VisionModel>) {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

    match api_key {
        Some(key) if provider != "mock" => {
            let base = cfg.llm.base_url.as_deref();
            tracing::info!(model = %cfg.llm.model, vision = %cfg.llm.vision_model, "Using OpenAI-compatible LLM");
            let mut chat = OpenAiClient::new(base, &cfg.llm.model, Some(&key));
            if let Some(t) = cfg.llm.temperature {
                chat = chat.with_temperature(t);
            }
            let vision = OpenAiClient::new(base, &cfg.llm.vision_model, Some(&key));
            (Arc::new(chat) as Arc<dyn ChatModel>, Arc::new(vision) as Arc<dyn VisionModel>)
        }
        _ => {
            tracing::warn!("No API key set or provider is mock, using Mock LLM");
            (
                Arc::new(MockChatModel) as Arc<dyn ChatModel>,
                Arc::new(MockVisionModel::default()) as Arc<dyn VisionModel>,
            )
        }
    }
}

async fn create_retriever_from_config(
    cfg: &AppConfig,
) -> Result<Arc<dyn KnowledgeRetriever>, AgentError> {
    match cfg.retriever.backend {
        RetrieverBackend::Static => Ok(Arc::new(StaticCatalog::demo())),
        RetrieverBackend::Remote => {
            let base = cfg.retriever.base_url.as_deref().ok_or_else(|| {
                AgentError::Config("retriever.base_url is required for the remote backend".to_string())
            })?;
            let catalog = RemoteCatalog::new(base, cfg.retriever.timeout_secs)
                .map_err(|e| AgentError::Config(e.to_string()))?;
            Ok(Arc::new(catalog))
        }
        RetrieverBackend::Embedding => {
            let path = cfg.retriever.catalog_path.as_ref().ok_or_else(|| {
                AgentError::Config("retriever.catalog_path is required for the embedding backend".to_string())
            })?;
            let embedder = create_embedder_from_config(
                cfg.llm.base_url.as_deref(),
                &cfg.retriever.embedding_model,
                None,
            )
            .ok_or_else(|| AgentError::Config("embedding backend needs OPENAI_API_KEY".to_string()))?;
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AgentError::Config(format!("catalog {}: {}", path.display(), e)))?;
            load_embedding_catalog(embedder, &text).await
        }
    }
}

/// 每行一条产品摘要，空行跳过
async fn load_embedding_catalog(
    embedder: Arc<dyn EmbeddingProvider>,
    text: &str,
) -> Result<Arc<dyn KnowledgeRetriever>, AgentError> {
    let catalog = EmbeddingCatalog::new(embedder);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        catalog
            .insert(line)
            .await
            .map_err(|e| AgentError::Config(format!("catalog entry: {}", e)))?;
    }
    tracing::info!(products = catalog.len().await, "embedding catalog loaded");
    Ok(Arc::new(catalog))
}

fn create_store_from_config(cfg: &AppConfig) -> Result<Arc<dyn CheckpointStore>, AgentError> {
    let data_dir = cfg.app.data_dir();
    let store: Arc<dyn CheckpointStore> = match cfg.checkpoint.backend {
        CheckpointBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
        CheckpointBackend::Sqlite => {
            let path = cfg
                .checkpoint
                .path
                .clone()
                .unwrap_or_else(|| data_dir.join("checkpoints.db"));
            tracing::info!(path = %path.display(), "sqlite checkpoint store");
            Arc::new(SqliteCheckpointStore::open(path)?)
        }
        CheckpointBackend::File => {
            let dir = cfg
                .checkpoint
                .path
                .clone()
                .unwrap_or_else(|| data_dir.join("threads"));
            Arc::new(FileCheckpointStore::new(dir))
        }
    };
    Ok(store)
}
