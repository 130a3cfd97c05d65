//! Headless Agent 运行时
//!
//! 供控制台 / HTTP 等前端调用：create_agent_components 从配置构建生成后端、评审器、动作执行器与人设上下文，
//! AgentRuntime 为每个会话持有独立的 ReplyController（共享组件与策略缓存，记忆互不干扰）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::actions::{default_registry, ActionExecutor};
use crate::config::{AppConfig, ReplySection, SessionSection};
use crate::core::{AgentError, ReplyController, ReplyOutcome};
use crate::evaluator::{LlmEvaluator, QualityEvaluator};
use crate::llm::{
    create_deepseek_backend, create_deepseek_client, ChatBackend, EchoBackend, GenerationBackend,
    LlmClient, MockLlmClient, OpenAiClient, OPENAI_BASE_URL,
};
use crate::notify::create_notifier_from_config;
use crate::persona::PersonaContext;
use crate::prompts::{load_prompt, DEFAULT_EVALUATOR_PROMPT, DEFAULT_SYSTEM_PROMPT};

/// 预构建的 Agent 组件，可被多个会话共享
#[derive(Clone)]
pub struct AgentComponents {
    pub backend: Arc<dyn GenerationBackend>,
    pub evaluator: Arc<dyn QualityEvaluator>,
    pub actions: Arc<ActionExecutor>,
    pub persona: Arc<PersonaContext>,
    pub reply: ReplySection,
}

impl AgentComponents {
    /// 新建一个拥有独立对话记忆的控制器
    pub fn controller(&self) -> ReplyController {
        ReplyController::new(
            self.backend.clone(),
            self.evaluator.clone(),
            self.actions.clone(),
            self.persona.clone(),
        )
        .with_settings(self.reply.clone())
    }
}

/// API Key 解析：provider 自己的变量优先，其次另一家；生成与评审共用同一结果
fn resolve_api_key(provider: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let order = if provider == "deepseek" {
        ["DEEPSEEK_API_KEY", "OPENAI_API_KEY"]
    } else {
        ["OPENAI_API_KEY", "DEEPSEEK_API_KEY"]
    };
    order
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
}

/// 生成后端：provider = openai / deepseek / mock
fn create_backend_from_config(
    cfg: &AppConfig,
    api_key: Option<&str>,
) -> Arc<dyn GenerationBackend> {
    let llm = &cfg.llm;
    let api_key = api_key.map(String::from);
    match llm.provider.as_str() {
        "mock" => Arc::new(EchoBackend),
        "deepseek" if llm.base_url.is_none() => Arc::new(
            create_deepseek_backend(Some(&llm.model), api_key, llm.timeouts.request)
                .with_temperature(llm.temperature),
        ),
        _ => {
            let base_url = llm.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Arc::new(
                ChatBackend::new(base_url, llm.model.clone(), api_key, llm.timeouts.request)
                    .with_temperature(llm.temperature),
            )
        }
    }
}

/// 评审模型客户端：默认与生成使用同一 provider / model / key
fn create_judge_from_config(cfg: &AppConfig, api_key: Option<&str>) -> Arc<dyn LlmClient> {
    let llm = &cfg.llm;
    let model = cfg.evaluator.model.as_deref().unwrap_or(&llm.model);
    match llm.provider.as_str() {
        "mock" => Arc::new(MockLlmClient),
        "deepseek" if llm.base_url.is_none() => Arc::new(
            create_deepseek_client(Some(model), api_key).with_temperature(cfg.evaluator.temperature),
        ),
        _ => Arc::new(
            OpenAiClient::new(llm.base_url.as_deref(), model, api_key)
                .with_temperature(cfg.evaluator.temperature),
        ),
    }
}

/// 从配置创建全部组件
pub fn create_agent_components(cfg: &AppConfig) -> AgentComponents {
    let system_template = load_prompt(
        cfg.app.system_prompt_path.as_deref(),
        "system.md",
        DEFAULT_SYSTEM_PROMPT,
    );
    let evaluator_template = load_prompt(
        cfg.app.evaluator_prompt_path.as_deref(),
        "evaluator.md",
        DEFAULT_EVALUATOR_PROMPT,
    );

    let api_key = resolve_api_key(&cfg.llm.provider, |name| std::env::var(name).ok());
    let judge = create_judge_from_config(cfg, api_key.as_deref());
    let evaluator = LlmEvaluator::new(judge, evaluator_template)
        .with_policy(cfg.evaluator.acceptance_policy());

    let notifier = Arc::from(create_notifier_from_config(&cfg.notify));
    let actions = ActionExecutor::new(default_registry(), notifier, cfg.actions.timeout_secs);

    let persona = PersonaContext::new(
        cfg.app.profile_dir.clone(),
        cfg.app.profile_documents.clone(),
        system_template,
    );

    tracing::info!(
        provider = %cfg.llm.provider,
        model = %cfg.llm.model,
        actions = ?actions.action_names(),
        "agent components ready"
    );

    AgentComponents {
        backend: create_backend_from_config(cfg, api_key.as_deref()),
        evaluator: Arc::new(evaluator),
        actions: Arc::new(actions),
        persona: Arc::new(persona),
        reply: cfg.reply.clone(),
    }
}

struct SessionEntry {
    controller: Arc<ReplyController>,
    last_used: Instant,
}

/// 会话运行时：无 session_id 时使用共享的默认控制器，否则按 session_id 懒建独立控制器。
/// 新建会话前先淘汰空闲超时的会话；仍达上限时淘汰最久未用的会话。
pub struct AgentRuntime {
    components: AgentComponents,
    default: Arc<ReplyController>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl AgentRuntime {
    pub fn new(components: AgentComponents) -> Self {
        let limits = SessionSection::default();
        Self::with_session_limits(
            components,
            limits.max_sessions,
            Duration::from_secs(limits.idle_ttl_secs),
        )
    }

    pub fn from_config(components: AgentComponents, sessions: &SessionSection) -> Self {
        Self::with_session_limits(
            components,
            sessions.max_sessions,
            Duration::from_secs(sessions.idle_ttl_secs),
        )
    }

    pub fn with_session_limits(
        components: AgentComponents,
        max_sessions: usize,
        idle_ttl: Duration,
    ) -> Self {
        let default = Arc::new(components.controller());
        Self {
            components,
            default,
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    pub fn components(&self) -> &AgentComponents {
        &self.components
    }

    pub async fn controller_for(&self, session_id: Option<&str>) -> Arc<ReplyController> {
        let Some(id) = session_id.map(str::trim).filter(|s| !s.is_empty()) else {
            return self.default.clone();
        };
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.controller.clone();
        }

        let before = sessions.len();
        sessions.retain(|_, e| now.duration_since(e.last_used) < self.idle_ttl);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    sessions.remove(&key);
                }
                None => break,
            }
        }
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "sessions evicted");
        }

        let controller = Arc::new(self.components.controller());
        sessions.insert(
            id.to_string(),
            SessionEntry {
                controller: controller.clone(),
                last_used: now,
            },
        );
        controller
    }

    /// 处理单条用户消息
    pub async fn process_message(
        &self,
        session_id: Option<&str>,
        user_input: &str,
    ) -> Result<ReplyOutcome, AgentError> {
        self.controller_for(session_id)
            .await
            .handle_message(user_input)
            .await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
