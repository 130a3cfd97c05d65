//! LLM 客户端抽象
//!
//! - LlmClient：纯文本补全（评审模型使用）
//! - GenerationBackend：带动作声明的生成，返回 Generation（文本回复或一批动作请求），
//!   供应商特定的响应形状在后端边界处一次性解码，回复循环不接触原始协议。

use async_trait::async_trait;

use crate::actions::ActionSpec;
use crate::core::AgentError;
use crate::memory::{ActionRequest, Message};

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}

/// 生成后端的一次响应
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// 候选回复
    Text(String),
    /// 请求执行一个或多个动作；content 为同时返回的文本（可为空，循环不把它当作候选）
    Actions {
        content: String,
        requests: Vec<ActionRequest>,
    },
}

impl Generation {
    pub fn text(content: impl Into<String>) -> Self {
        Generation::Text(content.into())
    }

    /// 请求列表为空时退化为文本回复
    pub fn from_parts(content: Option<String>, requests: Vec<ActionRequest>) -> Self {
        let content = content.unwrap_or_default();
        if requests.is_empty() {
            Generation::Text(content)
        } else {
            Generation::Actions { content, requests }
        }
    }
}

/// 生成后端：transcript + 已声明动作 -> Generation
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        transcript: &[Message],
        actions: &[ActionSpec],
    ) -> Result<Generation, AgentError>;
}
