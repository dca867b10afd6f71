//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `GLOW__*` 覆盖（双下划线表示嵌套，如 `GLOW__AGENT__RECURSION_LIMIT=20`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::context::DEFAULT_MAX_IMAGE_BYTES;
use crate::react::{ToolFailurePolicy, DEFAULT_RECURSION_LIMIT};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub checkpoint: CheckpointSection,
    pub retriever: RetrieverSection,
    pub image: ImageSection,
}

/// [app] 段：数据目录、日志格式
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 数据目录，未设置时用 ./data
    pub data_dir: Option<PathBuf>,
    /// 以 JSON 行输出日志
    #[serde(default)]
    pub json_logs: bool,
}

impl AppSection {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"))
    }
}

/// [llm] 段：对话模型与视觉模型
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openai（任意 OpenAI 兼容端点）/ mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    /// 自定义 system 提示词文件
    pub advisor_prompt_path: Option<PathBuf>,
    /// 自定义图片分析提示词文件
    pub vision_prompt_path: Option<PathBuf>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            vision_model: default_vision_model(),
            base_url: None,
            temperature: None,
            advisor_prompt_path: None,
            vision_prompt_path: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

/// [agent] 段：回合上限与工具失败策略
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    #[serde(default)]
    pub tool_failure_policy: ToolFailurePolicy,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            tool_failure_policy: ToolFailurePolicy::default(),
        }
    }
}

fn default_recursion_limit() -> usize {
    DEFAULT_RECURSION_LIMIT
}

/// [tools] 段：单次调用超时、同轮最大并发
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            max_parallel: default_max_parallel(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_max_parallel() -> usize {
    4
}

/// [checkpoint] 段：存储后端
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CheckpointSection {
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// sqlite 为数据库文件，file 为目录；未设置时放在 data_dir 下
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    Memory,
    #[default]
    Sqlite,
    File,
}

/// [retriever] 段：产品目录来源
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieverSection {
    #[serde(default)]
    pub backend: RetrieverBackend,
    /// remote 后端的服务地址
    pub base_url: Option<String>,
    /// embedding 后端的目录文件，每行一条产品摘要
    pub catalog_path: Option<PathBuf>,
    #[serde(default = "default_retriever_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for RetrieverSection {
    fn default() -> Self {
        Self {
            backend: RetrieverBackend::default(),
            base_url: None,
            catalog_path: None,
            timeout_secs: default_retriever_timeout_secs(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverBackend {
    Remote,
    /// 启动时把目录文件逐行嵌入到内存向量索引
    Embedding,
    /// 内置演示目录
    #[default]
    Static,
}

fn default_retriever_timeout_secs() -> u64 {
    15
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// [image] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSection {
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: usize,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            max_bytes: default_max_image_bytes(),
        }
    }
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

/// 从 config 目录加载配置，环境变量 GLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 GLOW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("GLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
