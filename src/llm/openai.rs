//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! 工具调用与图片消息的请求体直接用 JSON 构造，经 byot 接口发送，响应解析为本模块的精简结构。

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ImageInput;
use crate::llm::{AssistantReply, ChatModel, TokenUsage, VisionModel};
use crate::memory::{Message, MessageBody, ToolCallRequest};
use crate::tools::ToolDeclaration;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<RawToolCall>>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: String,
    function: RawFunction,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// OpenAI 兼容客户端：持有 Client 与 model 名；同一类型既可作对话模型也可作视觉模型
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new()
                .with_api_base(url)
                .with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: None,
            usage: TokenUsage::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    async fn send(&self, mut request: Value) -> Result<ResponseMessage, String> {
        if let Some(t) = self.temperature {
            request["temperature"] = json!(t);
        }
        let response: ChatResponse = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(usage) = &response.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| "response contained no choices".to_string())
    }
}

/// 把历史转换为 chat/completions 的 messages 数组
fn to_openai_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match &m.body {
            MessageBody::System { content } => json!({"role": "system", "content": content}),
            MessageBody::User { content } => json!({"role": "user", "content": content}),
            MessageBody::Assistant { content, tool_calls } if tool_calls.is_empty() => {
                json!({"role": "assistant", "content": content})
            }
            MessageBody::Assistant { content, tool_calls } => {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": c.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if content.is_empty() { Value::Null } else { json!(content) };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            MessageBody::Tool { call_id, content, .. } => {
                json!({"role": "tool", "tool_call_id": call_id, "content": content})
            }
        })
        .collect()
}

fn to_openai_tools(tools: &[ToolDeclaration]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect()
}

/// 参数字符串不是合法 JSON 时原样保留为字符串，交给工具校验拒绝
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn invoke(
        &self,
        history: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<AssistantReply, String> {
        let mut request = json!({
            "model": self.model,
            "messages": to_openai_messages(history),
        });
        if !tools.is_empty() {
            request["tools"] = Value::Array(to_openai_tools(tools));
        }

        let message = self.send(request).await?;
        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCallRequest::new(c.id, c.function.name, parse_arguments(&c.function.arguments)))
            .collect();

        Ok(AssistantReply {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn analyze(
        &self,
        system: &str,
        prompt: &str,
        image: &ImageInput,
    ) -> Result<String, String> {
        let request = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": prompt},
                        {"type": "image_url", "image_url": {"url": image.to_data_url()}}
                    ]
                }
            ],
        });
        let message = self.send(request).await?;
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "vision model returned no text".to_string())
    }
}
