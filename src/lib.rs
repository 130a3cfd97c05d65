//! Career Agent - 代表求职者回复雇主消息的智能体
//!
//! 模块划分：
//! - **actions**: 动作注册表、参数 Schema 校验与执行器（记录联系方式 / 未知问题 / 面试请求）
//! - **agent**: 无头 Agent 运行时（供控制台 / HTTP 调用），按会话持有控制器
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、回复循环状态、ReplyController
//! - **evaluator**: 质量评审（LLM 评分 + 接受策略）
//! - **llm**: LLM 客户端与生成后端（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话 Turn 与对话记忆
//! - **notify**: 推送通知（Pushover / 日志）
//! - **persona**: 人设资料加载与策略文本
//! - **prompts**: 默认 Prompt 模板

pub mod actions;
pub mod agent;
pub mod config;
pub mod core;
pub mod evaluator;
pub mod llm;
pub mod memory;
pub mod notify;
pub mod observability;
pub mod persona;
pub mod prompts;

pub use agent::{create_agent_components, AgentComponents, AgentRuntime};
pub use core::{AgentError, ReplyController, ReplyOutcome};
