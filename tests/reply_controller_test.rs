//! 回复循环集成测试：脚本化生成后端 + 脚本化评审器 + 内存通知

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use career_agent::actions::{default_registry, ActionExecutor, ActionSpec};
use career_agent::config::{ReplySection, DEFAULT_FALLBACK_REPLY};
use career_agent::core::{AgentError, ReplyController, Termination};
use career_agent::evaluator::{Evaluation, LlmEvaluator, QualityEvaluator, Scores};
use career_agent::llm::mock::action_request;
use career_agent::llm::{Generation, GenerationBackend, MockLlmClient, ScriptedBackend};
use career_agent::memory::{Message, Role};
use career_agent::notify::MemoryNotifier;
use career_agent::persona::PersonaContext;
use career_agent::prompts::DEFAULT_EVALUATOR_PROMPT;

const POLICY: &str = "You are the career assistant for Jane Doe, a backend engineer.";

/// 按顺序回放预设的评审结果，并记录收到的 (候选, 用户消息, 策略文本)
#[derive(Default)]
struct ScriptedEvaluator {
    script: Mutex<VecDeque<Evaluation>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedEvaluator {
    fn new(script: impl IntoIterator<Item = Evaluation>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QualityEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        candidate: &str,
        message: &str,
        policy_text: &str,
    ) -> Result<Evaluation, AgentError> {
        self.calls.lock().unwrap().push((
            candidate.to_string(),
            message.to_string(),
            policy_text.to_string(),
        ));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Evaluator("scripted evaluator exhausted".to_string()))
    }
}

fn accept(confidence: f64) -> Evaluation {
    Evaluation {
        is_acceptable: true,
        feedback: "Good response".to_string(),
        confidence,
        scores: Scores::uniform(9.0),
    }
}

fn reject(confidence: f64, feedback: &str) -> Evaluation {
    Evaluation {
        is_acceptable: false,
        feedback: feedback.to_string(),
        confidence,
        scores: Scores::uniform(4.0),
    }
}

fn out_of_scope() -> Evaluation {
    Evaluation {
        is_acceptable: false,
        feedback: "OUT_OF_SCOPE: the employer asked for a poem".to_string(),
        confidence: 0.7,
        scores: Scores::from_array([8.0, 8.0, 8.0, 8.0, 8.0, 1.0]),
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    evaluator: Arc<ScriptedEvaluator>,
    notifier: Arc<MemoryNotifier>,
    controller: ReplyController,
}

fn harness(backend: ScriptedBackend, evaluator: ScriptedEvaluator) -> Harness {
    harness_with(backend, evaluator, ReplySection::default())
}

fn harness_with(
    backend: ScriptedBackend,
    evaluator: ScriptedEvaluator,
    settings: ReplySection,
) -> Harness {
    let backend = Arc::new(backend);
    let evaluator = Arc::new(evaluator);
    let notifier = Arc::new(MemoryNotifier::new());
    let actions = Arc::new(ActionExecutor::new(default_registry(), notifier.clone(), 5));
    let controller = ReplyController::new(
        backend.clone(),
        evaluator.clone(),
        actions,
        Arc::new(PersonaContext::from_policy_text(POLICY)),
    )
    .with_settings(settings);
    Harness {
        backend,
        evaluator,
        notifier,
        controller,
    }
}

#[tokio::test]
async fn test_accepts_first_candidate() {
    let h = harness(
        ScriptedBackend::replies(["Thanks for reaching out! I'd love to hear more."]),
        ScriptedEvaluator::new([accept(0.9)]),
    );

    let outcome = h.controller.handle_message("Hi, are you open to roles?").await.unwrap();

    assert_eq!(outcome.reply, "Thanks for reaching out! I'd love to hear more.");
    assert_eq!(outcome.confidence, 0.9);
    assert_eq!(outcome.termination, Termination::Accepted);
    assert_eq!(outcome.evaluation_log.len(), 1);
    assert_eq!(outcome.evaluation_log[0].revision, 0);
    assert!(outcome.evaluation_log[0].is_acceptable);

    let calls = h.evaluator.calls();
    assert_eq!(calls[0].1, "Hi, are you open to roles?");
    assert_eq!(calls[0].2, POLICY);

    let transcript = &h.backend.transcripts()[0];
    assert_eq!(transcript[0].role, Role::System);
    assert_eq!(transcript[0].content, POLICY);
    assert_eq!(transcript[1].role, Role::User);
}

#[tokio::test]
async fn test_out_of_scope_escalates_to_fallback() {
    let h = harness(
        ScriptedBackend::replies(["Roses are red..."]),
        ScriptedEvaluator::new([out_of_scope()]),
    );

    let outcome = h.controller.handle_message("Write me a poem").await.unwrap();

    assert_eq!(outcome.reply, DEFAULT_FALLBACK_REPLY);
    assert_eq!(outcome.confidence, 0.0);
    assert_eq!(outcome.termination, Termination::Escalated);
    assert_eq!(outcome.evaluation_log.len(), 1);
    assert!(outcome.evaluation_log[0].feedback.starts_with("OUT_OF_SCOPE"));
    assert_eq!(h.backend.calls(), 1);

    let history = h.controller.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, DEFAULT_FALLBACK_REPLY);
}

#[tokio::test]
async fn test_escalation_after_revision_discards_best_candidate() {
    let h = harness(
        ScriptedBackend::replies(["first draft", "second draft"]),
        ScriptedEvaluator::new([reject(0.8, "Too vague"), out_of_scope()]),
    );

    let outcome = h.controller.handle_message("Tell me a joke").await.unwrap();

    assert_eq!(outcome.reply, DEFAULT_FALLBACK_REPLY);
    assert_eq!(outcome.confidence, 0.0);
    assert_eq!(outcome.evaluation_log.len(), 2);
}

#[tokio::test]
async fn test_revision_then_accept() {
    let h = harness(
        ScriptedBackend::replies(["draft", "better draft"]),
        ScriptedEvaluator::new([reject(0.4, "Mention your Rust experience"), accept(0.85)]),
    );

    let outcome = h.controller.handle_message("What do you work on?").await.unwrap();

    assert_eq!(outcome.reply, "better draft");
    assert_eq!(outcome.confidence, 0.85);
    assert_eq!(outcome.evaluation_log.len(), 2);
    assert_eq!(outcome.evaluation_log[1].revision, 1);

    // 第二次生成看到被拒候选与内部修订指令
    let second = &h.backend.transcripts()[1];
    let n = second.len();
    assert_eq!(second[n - 2].role, Role::Assistant);
    assert_eq!(second[n - 2].content, "draft");
    assert_eq!(second[n - 1].role, Role::User);
    assert!(second[n - 1].content.starts_with("[INTERNAL REVIEWER FEEDBACK"));
    assert!(second[n - 1].content.contains("Mention your Rust experience"));

    // 修订指令不进入对话记忆
    let history = h.controller.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "better draft");
}

#[tokio::test]
async fn test_exhaustion_returns_best_so_far() {
    let h = harness(
        ScriptedBackend::replies(["weak", "decent", "worse"]),
        ScriptedEvaluator::new([
            reject(0.3, "Too short"),
            reject(0.6, "Add a closing line"),
            reject(0.2, "Off tone"),
        ]),
    );

    let outcome = h.controller.handle_message("Can you tell me about yourself?").await.unwrap();

    assert_eq!(outcome.reply, "decent");
    assert_eq!(outcome.confidence, 0.6);
    assert_eq!(outcome.termination, Termination::Exhausted);
    let revisions: Vec<usize> = outcome.evaluation_log.iter().map(|r| r.revision).collect();
    assert_eq!(revisions, vec![0, 1, 2]);
    assert_eq!(h.backend.calls(), 3);

    let history = h.controller.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "decent");
}

#[tokio::test]
async fn test_action_round_is_not_evaluated() {
    let request = action_request(
        "record_user_details",
        json!({"email": "recruiter@example.com", "name": "Sam"}),
    );
    let request_id = request.id.clone();
    let h = harness(
        ScriptedBackend::new([
            Generation::Actions {
                content: String::new(),
                requests: vec![request],
            },
            Generation::text("Thanks Sam, I'll be in touch shortly."),
        ]),
        ScriptedEvaluator::new([accept(0.9)]),
    );

    let outcome = h
        .controller
        .handle_message("Reach me at recruiter@example.com")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Thanks Sam, I'll be in touch shortly.");
    assert_eq!(outcome.evaluation_log.len(), 1);
    assert_eq!(h.evaluator.calls().len(), 1);

    let second = &h.backend.transcripts()[1];
    let requested = second.iter().find(|m| m.has_action_requests()).unwrap();
    assert_eq!(requested.action_requests[0].id, request_id);
    let result = second.iter().find(|m| m.role == Role::Action).unwrap();
    assert_eq!(result.action_request_id.as_deref(), Some(request_id.as_str()));
    assert!(result.content.contains("succeeded"));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "New Employer Contact");

    // 动作 Turn 只存在于本次 transcript
    let history = h.controller.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|m| m.role != Role::Action));
}

#[tokio::test]
async fn test_unknown_action_is_skipped() {
    let h = harness(
        ScriptedBackend::new([
            Generation::Actions {
                content: String::new(),
                requests: vec![action_request("transfer_funds", json!({"amount": 100}))],
            },
            Generation::text("Happy to chat about the role."),
        ]),
        ScriptedEvaluator::new([accept(0.75)]),
    );

    let outcome = h.controller.handle_message("Hello").await.unwrap();

    assert_eq!(outcome.reply, "Happy to chat about the role.");
    let second = &h.backend.transcripts()[1];
    let result = second.iter().find(|m| m.role == Role::Action).unwrap();
    assert!(result.content.contains("skipped"));
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_failed_action_does_not_abort_round() {
    let missing_email = action_request("record_user_details", json!({"name": "Sam"}));
    let question = action_request(
        "record_unknown_question",
        json!({"question": "What is your expected salary in CHF?"}),
    );
    let (failed_id, ok_id) = (missing_email.id.clone(), question.id.clone());
    let h = harness(
        ScriptedBackend::new([
            Generation::Actions {
                content: "Let me note that.".to_string(),
                requests: vec![missing_email, question],
            },
            Generation::text("I'll follow up personally on compensation."),
        ]),
        ScriptedEvaluator::new([accept(0.8)]),
    );

    let outcome = h.controller.handle_message("Salary expectations?").await.unwrap();
    assert_eq!(outcome.reply, "I'll follow up personally on compensation.");

    let second = &h.backend.transcripts()[1];
    let result_for = |id: &str| {
        second
            .iter()
            .find(|m| m.role == Role::Action && m.action_request_id.as_deref() == Some(id))
            .unwrap()
            .content
            .clone()
    };
    assert!(result_for(&failed_id).contains("failed"));
    assert!(result_for(&ok_id).contains("succeeded"));

    let mut titles: Vec<String> = h.notifier.sent().into_iter().map(|n| n.title).collect();
    titles.sort();
    assert_eq!(titles, vec!["Action Failed", "Human Intervention Needed"]);
}

#[tokio::test]
async fn test_action_rounds_are_bounded() {
    let settings = ReplySection {
        max_action_rounds: 2,
        ..ReplySection::default()
    };
    let looping = || Generation::Actions {
        content: String::new(),
        requests: vec![action_request("record_unknown_question", json!({"question": "?"}))],
    };
    let h = harness_with(
        ScriptedBackend::new([looping(), looping(), looping()]),
        ScriptedEvaluator::new([]),
        settings,
    );

    let err = h.controller.handle_message("Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::ActionRoundsExceeded(2)));
    assert!(h.evaluator.calls().is_empty());
}

#[tokio::test]
async fn test_backend_failure_propagates() {
    let backend = ScriptedBackend::new([]);
    backend.push_failure("connection reset");
    let h = harness(backend, ScriptedEvaluator::new([]));

    let err = h.controller.handle_message("Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Backend(ref e) if e.contains("connection reset")));
    assert!(h.evaluator.calls().is_empty());
}

#[tokio::test]
async fn test_evaluator_failure_propagates() {
    let h = harness(ScriptedBackend::replies(["draft"]), ScriptedEvaluator::new([]));
    let err = h.controller.handle_message("Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Evaluator(_)));
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let h = harness(ScriptedBackend::replies(["unused"]), ScriptedEvaluator::new([]));

    let err = h.controller.handle_message("   ").await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyMessage));
    assert_eq!(h.backend.calls(), 0);
    assert!(h.controller.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_carries_previous_exchanges() {
    let h = harness(
        ScriptedBackend::replies(["Hello!", "I mostly write Rust."]),
        ScriptedEvaluator::new([accept(0.9), accept(0.9)]),
    );

    h.controller.handle_message("Hi").await.unwrap();
    h.controller.handle_message("What languages do you use?").await.unwrap();

    let history = h.controller.history().await.unwrap();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    // system + 第一轮两条 + 当前用户消息
    let second = &h.backend.transcripts()[1];
    assert_eq!(second.len(), 4);
    assert_eq!(second[2].content, "Hello!");
}

#[tokio::test]
async fn test_full_marks_from_llm_judge_are_accepted() {
    let backend = Arc::new(ScriptedBackend::replies(["I'd be glad to discuss the role."]));
    let evaluator = Arc::new(LlmEvaluator::new(
        Arc::new(MockLlmClient),
        DEFAULT_EVALUATOR_PROMPT,
    ));
    let actions = Arc::new(ActionExecutor::new(
        default_registry(),
        Arc::new(MemoryNotifier::new()),
        5,
    ));
    let controller = ReplyController::new(
        backend,
        evaluator,
        actions,
        Arc::new(PersonaContext::from_policy_text(POLICY)),
    );

    let outcome = controller.handle_message("Are you available?").await.unwrap();
    assert_eq!(outcome.termination, Termination::Accepted);
    assert_eq!(outcome.confidence, 1.0);
    assert_eq!(outcome.evaluation_log[0].scores, Scores::uniform(10.0));
}

/// 每次生成前让出执行权，回显最后一条用户消息
struct SlowEchoBackend;

#[async_trait]
impl GenerationBackend for SlowEchoBackend {
    async fn generate(
        &self,
        transcript: &[Message],
        _actions: &[ActionSpec],
    ) -> Result<Generation, AgentError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let last_user = transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(Generation::text(format!("re: {}", last_user)))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_on_one_controller_are_serialized() {
    let controller = Arc::new(ReplyController::new(
        Arc::new(SlowEchoBackend),
        Arc::new(LlmEvaluator::new(Arc::new(MockLlmClient), DEFAULT_EVALUATOR_PROMPT)),
        Arc::new(ActionExecutor::new(
            default_registry(),
            Arc::new(MemoryNotifier::new()),
            5,
        )),
        Arc::new(PersonaContext::from_policy_text(POLICY)),
    ));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.handle_message(&format!("message {}", i)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = controller.history().await.unwrap();
    assert_eq!(history.len(), 40);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
    }
}
