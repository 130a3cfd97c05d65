//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CAREER__*` 覆盖（双下划线表示嵌套，如 `CAREER__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::evaluator::{
    AcceptancePolicy, DEFAULT_RELEVANCE_FLOOR, DEFAULT_SCORE_FLOOR, DEFAULT_SCORE_THRESHOLD,
};
use crate::notify::PUSHOVER_ENDPOINT;
use crate::persona::ProfileDocument;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub evaluator: EvaluatorSection,
    pub reply: ReplySection,
    pub actions: ActionsSection,
    pub notify: NotifySection,
    pub web: WebSection,
    pub sessions: SessionSection,
}

/// [app] 段：应用名、资料目录与文档、prompt 文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 资料目录，默认 ./me
    pub profile_dir: PathBuf,
    pub profile_documents: Vec<ProfileDocument>,
    /// system prompt 模板文件；未设置时查找 config/prompts/system.md
    pub system_prompt_path: Option<PathBuf>,
    /// 评审 prompt 模板文件；未设置时查找 config/prompts/evaluator.md
    pub evaluator_prompt_path: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            profile_dir: PathBuf::from("me"),
            profile_documents: default_profile_documents(),
            system_prompt_path: None,
            evaluator_prompt_path: None,
        }
    }
}

fn default_profile_documents() -> Vec<ProfileDocument> {
    vec![
        ProfileDocument::new("CV Summary", "ecg-summary.txt"),
        ProfileDocument::new("LinkedIn Profile", "ecg-linkedin.txt"),
    ]
}

/// [llm] 段：生成后端选择、采样温度与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / deepseek / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.4,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [evaluator] 段：评审模型与验收规则
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluatorSection {
    /// 评审模型；未设置时与 [llm].model 相同
    pub model: Option<String>,
    pub temperature: f32,
    pub score_floor: f64,
    pub score_threshold: f64,
    pub relevance_floor: f64,
}

impl Default for EvaluatorSection {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            score_floor: DEFAULT_SCORE_FLOOR,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
        }
    }
}

impl EvaluatorSection {
    pub fn acceptance_policy(&self) -> AcceptancePolicy {
        AcceptancePolicy {
            score_floor: self.score_floor,
            score_threshold: self.score_threshold,
            relevance_floor: self.relevance_floor,
        }
    }
}

/// [reply] 段：修订预算、动作轮次上限、越界兜底回复
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplySection {
    pub max_revisions: usize,
    pub max_action_rounds: usize,
    pub fallback_reply: String,
}

pub const DEFAULT_MAX_REVISIONS: usize = 3;
pub const DEFAULT_MAX_ACTION_ROUNDS: usize = 8;
pub const DEFAULT_FALLBACK_REPLY: &str = "I'm not able to help with that. I can assist with questions about my background, projects, or career opportunities.";

impl Default for ReplySection {
    fn default() -> Self {
        Self {
            max_revisions: DEFAULT_MAX_REVISIONS,
            max_action_rounds: DEFAULT_MAX_ACTION_ROUNDS,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

/// [actions] 段：单次动作超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionsSection {
    pub timeout_secs: u64,
}

impl Default for ActionsSection {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// [notify] 段：推送端点与凭据（凭据缺省时读 PUSHOVER_TOKEN / PUSHOVER_USER）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub enabled: bool,
    pub endpoint: String,
    pub token: Option<String>,
    pub user: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            token: None,
            user: None,
            timeout_secs: 10,
        }
    }
}

/// [web] 段：HTTP 监听地址与单次请求超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 180,
        }
    }
}

/// [sessions] 段：按 session_id 保留的控制器上限与空闲淘汰时间
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            idle_ttl_secs: 3600,
        }
    }
}

/// 从 config 目录加载配置，环境变量 CAREER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CAREER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CAREER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.reply.max_revisions, 3);
        assert_eq!(cfg.evaluator.acceptance_policy(), AcceptancePolicy::default());
        assert_eq!(cfg.app.profile_documents.len(), 2);
        assert!(cfg.notify.enabled);
        assert_eq!(cfg.sessions.max_sessions, 1024);
    }

    #[test]
    fn test_load_explicit_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[reply]
max_revisions = 5

[evaluator]
score_threshold = 7.5

[[app.profile_documents]]
title = "Resume"
file = "resume.txt"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.reply.max_revisions, 5);
        assert_eq!(cfg.reply.max_action_rounds, DEFAULT_MAX_ACTION_ROUNDS);
        assert_eq!(cfg.evaluator.score_threshold, 7.5);
        assert_eq!(cfg.evaluator.score_floor, DEFAULT_SCORE_FLOOR);
        assert_eq!(
            cfg.app.profile_documents,
            vec![ProfileDocument::new("Resume", "resume.txt")]
        );
    }
}
