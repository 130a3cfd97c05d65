//! OpenAI 兼容 chat/completions 生成后端（支持 tool_calls）
//!
//! 将 Message 序列转为 OpenAI 消息格式（assistant.tool_calls / tool.tool_call_id），
//! 响应中的 tool_calls 解码为 Generation::Actions，否则为 Generation::Text。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actions::ActionSpec;
use crate::core::AgentError;
use crate::llm::{Generation, GenerationBackend};
use crate::memory::{ActionRequest, Message, Role};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDef<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "default_call_type")]
    typ: String,
    function: WireFunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// OpenAI 以 JSON 字符串传参
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ToolDef<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    function: FunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        let role = match m.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Action => "tool",
        };
        WireMessage {
            role,
            content: m.content.clone(),
            tool_calls: m
                .action_requests
                .iter()
                .map(|r| WireToolCall {
                    id: r.id.clone(),
                    typ: default_call_type(),
                    function: WireFunctionCall {
                        name: r.name.clone(),
                        arguments: r.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: m.action_request_id.clone(),
        }
    }
}

/// tool call 参数解码：非法 JSON 原样保留为字符串，交给执行器校验失败
fn decode_tool_call(call: WireToolCall) -> ActionRequest {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or(serde_json::Value::String(call.function.arguments));
    ActionRequest {
        id: call.id,
        name: call.function.name,
        arguments,
    }
}

/// HTTP 生成后端
pub struct ChatBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl ChatBackend {
    pub fn new(base_url: &str, model: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
            temperature: 0.4,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl GenerationBackend for ChatBackend {
    async fn generate(
        &self,
        transcript: &[Message],
        actions: &[ActionSpec],
    ) -> Result<Generation, AgentError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: transcript.iter().map(WireMessage::from).collect(),
            tools: actions
                .iter()
                .map(|a| ToolDef {
                    typ: "function",
                    function: FunctionDef {
                        name: &a.name,
                        description: &a.description,
                        parameters: &a.parameters,
                    },
                })
                .collect(),
            temperature: self.temperature,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req
            .send()
            .await
            .map_err(|e| AgentError::Backend(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| AgentError::Backend(e.to_string()))?;
        if !status.is_success() {
            return Err(AgentError::Backend(format!("LLM API error {}: {}", status, text)));
        }
        decode_response(&text)
    }
}

fn decode_response(text: &str) -> Result<Generation, AgentError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(text)
        .map_err(|e| AgentError::Backend(format!("response parse error: {}; body: {}", e, text)))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Backend("response has no choices".to_string()))?;
    let requests = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(decode_tool_call)
        .collect();
    Ok(Generation::from_parts(choice.message.content, requests))
}
