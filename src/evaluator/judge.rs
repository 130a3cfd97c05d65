//! LlmEvaluator：由评审模型打分的 QualityEvaluator
//!
//! 评审 prompt 由模板渲染（{policy} / {message} / {reply}），模型返回 JSON；
//! 解析后交给 AcceptancePolicy 重新计算 is_acceptable，缺字段或分数越界视为致命错误。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::AgentError;
use crate::evaluator::{AcceptancePolicy, Evaluation, QualityEvaluator, Scores};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::prompts::render_template;

/// 评审模型输出（is_acceptable 仅作参考，不参与判定）
#[derive(Debug, Deserialize)]
struct RawJudgement {
    #[serde(default)]
    #[allow(dead_code)]
    is_acceptable: Option<bool>,
    feedback: String,
    #[serde(default)]
    confidence: Option<f64>,
    scores: Scores,
}

/// 从评审输出中提取 JSON 对象（```json ... ``` 或裸 JSON）
fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 解析评审输出并应用验收规则
pub fn parse_judgement(output: &str, policy: &AcceptancePolicy) -> Result<Evaluation, AgentError> {
    let json = extract_json(output)
        .ok_or_else(|| AgentError::MalformedEvaluation(format!("no JSON object in: {}", output)))?;
    let raw: RawJudgement = serde_json::from_str(json)
        .map_err(|e| AgentError::MalformedEvaluation(format!("{}: {}", e, json)))?;
    if let Some(name) = raw.scores.out_of_range() {
        return Err(AgentError::MalformedEvaluation(format!(
            "score {} out of range",
            name
        )));
    }
    Ok(policy.judge(raw.scores, raw.feedback, raw.confidence))
}

/// 评审器：持有评审 LLM、prompt 模板与验收规则
pub struct LlmEvaluator {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    policy: AcceptancePolicy,
}

impl LlmEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
            policy: AcceptancePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    fn render_prompt(&self, reply: &str, message: &str, policy_text: &str) -> String {
        let score_floor = self.policy.score_floor.to_string();
        let score_threshold = self.policy.score_threshold.to_string();
        let relevance_floor = self.policy.relevance_floor.to_string();
        render_template(
            &self.prompt_template,
            &[
                ("score_floor", &score_floor),
                ("score_threshold", &score_threshold),
                ("relevance_floor", &relevance_floor),
                ("policy", policy_text),
                ("message", message),
                ("reply", reply),
            ],
        )
    }
}

#[async_trait]
impl QualityEvaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        candidate: &str,
        message: &str,
        policy_text: &str,
    ) -> Result<Evaluation, AgentError> {
        let prompt = self.render_prompt(candidate, message, policy_text);
        let output = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::Evaluator)?;
        let evaluation = parse_judgement(&output, &self.policy)?;

        tracing::info!(
            scores = ?evaluation.scores,
            acceptable = evaluation.is_acceptable,
            confidence = %format!("{:.2}", evaluation.confidence),
            "evaluator"
        );
        Ok(evaluation)
    }
}
