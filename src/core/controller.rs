//! ReplyController：单条消息的回复循环
//!
//! 用户消息 -> 追加到对话记忆 -> 拼 system(策略) + 记忆 -> 生成 ->
//! 若为动作请求则并发执行并写回 action-result，再次生成 ->
//! 若为文本候选则评审：越界升级 / 接受 / 带反馈修订 / 预算耗尽返回 best-so-far。
//! 每次调用恰好向记忆追加一条终态回复；同一 Controller 的调用串行执行。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::actions::ActionExecutor;
use crate::config::ReplySection;
use crate::core::state::{LoopState, RevisionTracker, Termination, Verdict};
use crate::core::AgentError;
use crate::evaluator::{Evaluation, QualityEvaluator, Scores};
use crate::llm::{Generation, GenerationBackend};
use crate::memory::{ConversationMemory, ConversationStore, Message};
use crate::persona::PersonaContext;

/// 评审日志中的一条记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionRecord {
    pub revision: usize,
    pub is_acceptable: bool,
    pub feedback: String,
    pub confidence: f64,
    pub scores: Scores,
}

impl RevisionRecord {
    fn new(revision: usize, evaluation: &Evaluation) -> Self {
        Self {
            revision,
            is_acceptable: evaluation.is_acceptable,
            feedback: evaluation.feedback.clone(),
            confidence: evaluation.confidence,
            scores: evaluation.scores,
        }
    }
}

/// handle_message 的结果：回复、置信度与本次调用的全部评审日志
#[derive(Debug, Clone, Serialize)]
pub struct ReplyOutcome {
    pub reply: String,
    pub confidence: f64,
    pub evaluation_log: Vec<RevisionRecord>,
    #[serde(skip)]
    pub termination: Termination,
}

/// 修订指令：只进入本次调用的 transcript，不写入对话记忆
fn reviewer_feedback(feedback: &str) -> String {
    format!(
        "[INTERNAL REVIEWER FEEDBACK - do not show to the employer]\n{}\n\nRewrite your reply addressing the above.",
        feedback
    )
}

/// 回复控制器：持有生成后端、评审器、动作执行器、人设上下文与对话记忆
pub struct ReplyController {
    backend: Arc<dyn GenerationBackend>,
    evaluator: Arc<dyn QualityEvaluator>,
    actions: Arc<ActionExecutor>,
    persona: Arc<PersonaContext>,
    memory: Arc<dyn ConversationStore>,
    settings: ReplySection,
    turn_lock: Mutex<()>,
}

impl ReplyController {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        evaluator: Arc<dyn QualityEvaluator>,
        actions: Arc<ActionExecutor>,
        persona: Arc<PersonaContext>,
    ) -> Self {
        Self {
            backend,
            evaluator,
            actions,
            persona,
            memory: Arc::new(ConversationMemory::new()),
            settings: ReplySection::default(),
            turn_lock: Mutex::new(()),
        }
    }

    /// 注入对话记忆实现（按会话隔离或持久化）
    pub fn with_memory(mut self, memory: Arc<dyn ConversationStore>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_settings(mut self, settings: ReplySection) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ReplySection {
        &self.settings
    }

    /// 当前对话记忆快照
    pub async fn history(&self) -> Result<Vec<Message>, AgentError> {
        self.memory.read().await
    }

    /// 处理一条用户消息
    pub async fn handle_message(&self, user_text: &str) -> Result<ReplyOutcome, AgentError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let _turn = self.turn_lock.lock().await;

        let policy = self.persona.policy_text().await;
        self.memory.append(Message::user(user_text)).await?;

        let mut transcript = vec![Message::system(policy)];
        transcript.extend(self.memory.read().await?);

        let specs = self.actions.specs();
        let mut tracker = RevisionTracker::new(self.settings.max_revisions);
        let mut evaluation_log = Vec::new();
        let mut action_rounds = 0usize;
        let mut state = LoopState::Generating;

        loop {
            state = match state {
                LoopState::Generating => match self.backend.generate(&transcript, &specs).await? {
                    Generation::Text(candidate) => LoopState::Evaluating { candidate },
                    Generation::Actions { content, requests } => {
                        LoopState::DispatchingActions { content, requests }
                    }
                },

                LoopState::DispatchingActions { content, requests } => {
                    action_rounds += 1;
                    if action_rounds > self.settings.max_action_rounds {
                        tracing::error!(
                            rounds = action_rounds,
                            "Backend kept requesting actions, aborting"
                        );
                        return Err(AgentError::ActionRoundsExceeded(self.settings.max_action_rounds));
                    }
                    tracing::info!(round = action_rounds, count = requests.len(), "dispatching actions");

                    let outcomes = self.actions.dispatch_all(&requests).await;
                    let results: Vec<Message> = requests
                        .iter()
                        .zip(&outcomes)
                        .map(|(req, outcome)| Message::action_result(req.id.clone(), outcome.to_content()))
                        .collect();
                    transcript.push(Message::assistant_with_actions(content, requests));
                    transcript.extend(results);
                    LoopState::Generating
                }

                LoopState::Evaluating { candidate } => {
                    let evaluation = self.evaluator.evaluate(&candidate, user_text, policy).await?;
                    evaluation_log.push(RevisionRecord::new(tracker.revision_count(), &evaluation));

                    match tracker.verdict(&candidate, &evaluation) {
                        Verdict::Escalate => {
                            tracing::warn!(feedback = %evaluation.feedback, "message out of scope, escalating");
                            LoopState::Escalated
                        }
                        Verdict::Accept { reply, confidence } => LoopState::Accepted { reply, confidence },
                        Verdict::Exhaust { reply, confidence } => {
                            tracing::warn!(
                                revisions = tracker.revision_count(),
                                confidence,
                                "hit max revisions, returning best attempt"
                            );
                            LoopState::Exhausted { reply, confidence }
                        }
                        Verdict::Revise { feedback } => {
                            tracing::info!(revision = tracker.revision_count(), feedback = %feedback, "revising reply");
                            transcript.push(Message::assistant(candidate));
                            transcript.push(Message::user(reviewer_feedback(&feedback)));
                            LoopState::Generating
                        }
                    }
                }

                LoopState::Accepted { reply, confidence } => {
                    return self
                        .finish(reply, confidence, evaluation_log, Termination::Accepted)
                        .await;
                }
                LoopState::Escalated => {
                    let fallback = self.settings.fallback_reply.clone();
                    return self
                        .finish(fallback, 0.0, evaluation_log, Termination::Escalated)
                        .await;
                }
                LoopState::Exhausted { reply, confidence } => {
                    return self
                        .finish(reply, confidence, evaluation_log, Termination::Exhausted)
                        .await;
                }
            };
        }
    }

    /// 终态：唯一一条回复写入对话记忆
    async fn finish(
        &self,
        reply: String,
        confidence: f64,
        evaluation_log: Vec<RevisionRecord>,
        termination: Termination,
    ) -> Result<ReplyOutcome, AgentError> {
        self.memory.append(Message::assistant(reply.clone())).await?;
        tracing::info!(
            termination = ?termination,
            confidence = %format!("{:.2}", confidence),
            rounds = evaluation_log.len(),
            "reply ready"
        );
        Ok(ReplyOutcome {
            reply,
            confidence,
            evaluation_log,
            termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_feedback_is_marked_internal() {
        let text = reviewer_feedback("Add a closing line");
        assert!(text.starts_with("[INTERNAL REVIEWER FEEDBACK"));
        assert!(text.contains("Add a closing line"));
    }

    #[test]
    fn test_outcome_serializes_external_shape() {
        let outcome = ReplyOutcome {
            reply: "Hello!".into(),
            confidence: 0.9,
            evaluation_log: vec![RevisionRecord {
                revision: 0,
                is_acceptable: true,
                feedback: "Good response".into(),
                confidence: 0.9,
                scores: Scores::uniform(9.0),
            }],
            termination: Termination::Accepted,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["reply"], "Hello!");
        assert!(json.get("termination").is_none());
        assert_eq!(json["evaluation_log"][0]["scores"]["career_relevance"], 9.0);
    }
}
