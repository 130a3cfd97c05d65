//! 评审层：对候选回复做多维打分，决定接受 / 修订 / 越界升级
//!
//! 评审器对回复循环的状态是纯的：只接收候选回复、触发消息与策略文本，不读写对话记忆。

pub mod judge;
pub mod policy;

use async_trait::async_trait;

use crate::core::AgentError;

pub use judge::{parse_judgement, LlmEvaluator};
pub use policy::{
    AcceptancePolicy, Evaluation, Scores, DEFAULT_RELEVANCE_FLOOR, DEFAULT_SCORE_FLOOR,
    DEFAULT_SCORE_THRESHOLD, OUT_OF_SCOPE_MARKER, SCORE_MAX, SCORE_MIN,
};

/// 质量评审 trait
#[async_trait]
pub trait QualityEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        candidate: &str,
        message: &str,
        policy_text: &str,
    ) -> Result<Evaluation, AgentError>;
}
