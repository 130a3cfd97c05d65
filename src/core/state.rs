//! 回复循环状态：显式状态枚举 + 修订累加器
//!
//! LoopState 描述单次 handle_message 当前所处阶段；RevisionTracker 携带 best-so-far 与修订计数，
//! verdict() 把一次 Evaluation 映射为下一步动作，终止条件集中在此处，可脱离 I/O 单独测试。

use serde::Serialize;

use crate::evaluator::Evaluation;
use crate::memory::ActionRequest;

/// 循环阶段
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Generating,
    DispatchingActions {
        content: String,
        requests: Vec<ActionRequest>,
    },
    Evaluating {
        candidate: String,
    },
    Accepted {
        reply: String,
        confidence: f64,
    },
    Escalated,
    Exhausted {
        reply: String,
        confidence: f64,
    },
}

/// 调用结束时的终态（对外只暴露种类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Accepted,
    Escalated,
    Exhausted,
}

/// 对一次评审结果的裁决
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 越界：返回固定兜底回复，置信度 0
    Escalate,
    Accept { reply: String, confidence: f64 },
    /// 修订：携带评审反馈，回到生成
    Revise { feedback: String },
    /// 预算耗尽：返回 best-so-far
    Exhaust { reply: String, confidence: f64 },
}

/// 修订累加器：{best_reply, best_confidence, revision_count}
#[derive(Debug, Clone)]
pub struct RevisionTracker {
    best_reply: Option<String>,
    best_confidence: f64,
    revision_count: usize,
    last_candidate: Option<String>,
    max_revisions: usize,
}

impl RevisionTracker {
    pub fn new(max_revisions: usize) -> Self {
        Self {
            best_reply: None,
            best_confidence: 0.0,
            revision_count: 0,
            last_candidate: None,
            max_revisions: max_revisions.max(1),
        }
    }

    pub fn revision_count(&self) -> usize {
        self.revision_count
    }

    /// best-so-far：置信度严格大于当前最佳才替换，与是否可接受无关
    pub fn observe(&mut self, candidate: &str, confidence: f64) {
        self.last_candidate = Some(candidate.to_string());
        if confidence > self.best_confidence {
            self.best_reply = Some(candidate.to_string());
            self.best_confidence = confidence;
        }
    }

    /// 预算耗尽时的结果；没有候选超过初始置信度时退回最后一个候选
    pub fn settle(&self) -> (String, f64) {
        match (&self.best_reply, &self.last_candidate) {
            (Some(best), _) => (best.clone(), self.best_confidence),
            (None, Some(last)) => (last.clone(), self.best_confidence),
            (None, None) => (String::new(), 0.0),
        }
    }

    /// 裁决顺序：越界检查 -> best-so-far 更新 -> 接受检查 -> 修订 / 耗尽
    pub fn verdict(&mut self, candidate: &str, evaluation: &Evaluation) -> Verdict {
        if evaluation.is_out_of_scope() {
            return Verdict::Escalate;
        }

        self.observe(candidate, evaluation.confidence);

        if evaluation.is_acceptable {
            return Verdict::Accept {
                reply: candidate.to_string(),
                confidence: evaluation.confidence,
            };
        }

        self.revision_count += 1;
        if self.revision_count >= self.max_revisions {
            let (reply, confidence) = self.settle();
            return Verdict::Exhaust { reply, confidence };
        }

        Verdict::Revise {
            feedback: evaluation.feedback.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Scores;

    fn eval(acceptable: bool, confidence: f64, feedback: &str) -> Evaluation {
        Evaluation {
            is_acceptable: acceptable,
            feedback: feedback.to_string(),
            confidence,
            scores: Scores::uniform(confidence * 10.0),
        }
    }

    #[test]
    fn test_exhaustion_returns_highest_confidence() {
        let mut tracker = RevisionTracker::new(3);
        assert!(matches!(
            tracker.verdict("a", &eval(false, 0.3, "more")),
            Verdict::Revise { .. }
        ));
        assert!(matches!(
            tracker.verdict("b", &eval(false, 0.6, "more")),
            Verdict::Revise { .. }
        ));
        assert_eq!(
            tracker.verdict("c", &eval(false, 0.2, "more")),
            Verdict::Exhaust {
                reply: "b".into(),
                confidence: 0.6
            }
        );
        assert_eq!(tracker.revision_count(), 3);
    }

    #[test]
    fn test_equal_confidence_keeps_first() {
        let mut tracker = RevisionTracker::new(3);
        tracker.observe("first", 0.5);
        tracker.observe("second", 0.5);
        assert_eq!(tracker.settle(), ("first".to_string(), 0.5));
    }

    #[test]
    fn test_zero_confidence_falls_back_to_last_candidate() {
        let mut tracker = RevisionTracker::new(2);
        tracker.verdict("x", &eval(false, 0.0, "bad"));
        assert_eq!(
            tracker.verdict("y", &eval(false, 0.0, "bad")),
            Verdict::Exhaust {
                reply: "y".into(),
                confidence: 0.0
            }
        );
    }

    #[test]
    fn test_escalation_skips_best_tracking() {
        let mut tracker = RevisionTracker::new(3);
        let verdict = tracker.verdict("off topic", &eval(false, 0.9, "OUT_OF_SCOPE: trivia"));
        assert_eq!(verdict, Verdict::Escalate);
        assert_eq!(tracker.settle(), (String::new(), 0.0));
        assert_eq!(tracker.revision_count(), 0);
    }

    #[test]
    fn test_accept_updates_best_first() {
        let mut tracker = RevisionTracker::new(3);
        let verdict = tracker.verdict("great", &eval(true, 0.9, "Good response"));
        assert_eq!(
            verdict,
            Verdict::Accept {
                reply: "great".into(),
                confidence: 0.9
            }
        );
        assert_eq!(tracker.settle(), ("great".to_string(), 0.9));
    }
}
