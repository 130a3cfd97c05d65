//! Agent 错误类型
//!
//! 传输失败（生成后端 / 评审模型）对当前调用是致命的，直接向上传播；
//! 升级（OUT_OF_SCOPE）与预算耗尽不是错误，由回复循环作为终态处理。

use thiserror::Error;

/// 回复循环及其协作组件可能产生的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Message must not be empty")]
    EmptyMessage,

    /// 生成后端不可达或返回无法解码的响应
    #[error("Generation backend error: {0}")]
    Backend(String),

    /// 评审模型调用失败
    #[error("Evaluator error: {0}")]
    Evaluator(String),

    /// 评审结果缺少必填字段或分数越界；不做静默默认通过
    #[error("Malformed evaluation: {0}")]
    MalformedEvaluation(String),

    /// 单次调用内的动作轮次超过上限
    #[error("Action rounds exceeded ({0})")]
    ActionRoundsExceeded(usize),

    #[error("Conversation memory error: {0}")]
    Memory(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 是否为调用方输入问题（HTTP 边界映射为 400 而不是 500）
    pub fn is_client_error(&self) -> bool {
        matches!(self, AgentError::EmptyMessage)
    }
}
