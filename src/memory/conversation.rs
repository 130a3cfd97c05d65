//! 对话记忆：Turn 数据模型与可注入的 ConversationStore
//!
//! 对话是只追加的有序序列；Turn 一旦追加即不可变。
//! 回复循环只通过 ConversationStore 的 append / read 访问记忆，便于后续替换为按会话隔离或持久化的实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::AgentError;

/// 消息角色（与 LLM API 一致；Action 对应 OpenAI 的 tool 角色）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Action,
}

/// 生成后端请求执行的一次动作调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// 后端分配的调用 id，动作结果 Turn 通过它回指请求
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// 单条消息（一个 Turn）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_requests: Vec<ActionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            action_requests: Vec::new(),
            action_request_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// 携带动作请求的 assistant Turn（content 可为空）
    pub fn assistant_with_actions(content: impl Into<String>, requests: Vec<ActionRequest>) -> Self {
        Self {
            action_requests: requests,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// 动作结果 Turn，回指 request_id
    pub fn action_result(request_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action_request_id: Some(request_id.into()),
            ..Self::new(Role::Action, content)
        }
    }

    pub fn has_action_requests(&self) -> bool {
        !self.action_requests.is_empty()
    }
}

/// 对话记忆存储：只追加、可读取快照
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, message: Message) -> Result<(), AgentError>;

    /// 按追加顺序返回全部消息
    async fn read(&self) -> Result<Vec<Message>, AgentError>;
}

/// 进程内对话记忆：随进程生命周期单调增长，不剪枝
#[derive(Debug, Default)]
pub struct ConversationMemory {
    messages: RwLock<Vec<Message>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for ConversationMemory {
    async fn append(&self, message: Message) -> Result<(), AgentError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn read(&self) -> Result<Vec<Message>, AgentError> {
        Ok(self.messages.read().await.clone())
    }
}
