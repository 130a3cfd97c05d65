//! Mock 客户端（用于测试与离线运行，无需 API）
//!
//! - MockLlmClient：评审模型替身，总是给出满分 JSON 评审
//! - ScriptedLlm：按顺序回放预设的评审文本
//! - ScriptedBackend：按顺序回放预设的 Generation，并记录每次收到的 transcript

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::actions::ActionSpec;
use crate::core::AgentError;
use crate::llm::{Generation, GenerationBackend, LlmClient};
use crate::memory::{ActionRequest, Message, Role};

/// Mock 评审客户端：对任何候选回复都给出全 10 分
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        Ok(r#"{"is_acceptable": true, "feedback": "Good response", "scores": {"professionalism": 10, "clarity": 10, "completeness": 10, "safety": 10, "relevance": 10, "career_relevance": 10}}"#.to_string())
    }
}

/// 按顺序回放评审文本；用尽后返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedLlm {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
        }
    }

    pub fn push_error(&self, error: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(error.into()));
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        self.replies
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("scripted llm exhausted".to_string()))
    }
}

/// 按顺序回放 Generation；用尽后返回 Backend 错误
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<Generation, String>>>,
    transcripts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Generation>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// 依次回复这些文本候选
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Generation::Text(r.into())))
    }

    /// 追加一次传输失败
    pub fn push_failure(&self, error: impl Into<String>) {
        if let Ok(mut q) = self.script.lock() {
            q.push_back(Err(error.into()));
        }
    }

    /// 已收到的 transcript（每次 generate 一份）
    pub fn transcripts(&self) -> Vec<Vec<Message>> {
        self.transcripts
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.transcripts.lock().map(|t| t.len()).unwrap_or_default()
    }
}

/// 构造一个动作请求（id 随机）
pub fn action_request(name: &str, arguments: serde_json::Value) -> ActionRequest {
    ActionRequest {
        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
        name: name.to_string(),
        arguments,
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        transcript: &[Message],
        _actions: &[ActionSpec],
    ) -> Result<Generation, AgentError> {
        if let Ok(mut t) = self.transcripts.lock() {
            t.push(transcript.to_vec());
        }
        let next = self
            .script
            .lock()
            .map_err(|e| AgentError::Backend(e.to_string()))?
            .pop_front();
        match next {
            Some(Ok(generation)) => Ok(generation),
            Some(Err(e)) => Err(AgentError::Backend(e)),
            None => Err(AgentError::Backend("scripted backend exhausted".to_string())),
        }
    }
}

/// 离线演示用后端：回显最后一条用户消息
#[derive(Debug, Default)]
pub struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn generate(
        &self,
        transcript: &[Message],
        _actions: &[ActionSpec],
    ) -> Result<Generation, AgentError> {
        let last_user = transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(Generation::Text(format!("Echo from Mock: {}", last_user)))
    }
}
