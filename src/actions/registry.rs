//! 动作注册表
//!
//! 所有动作实现 Action trait（name / description / parameters_schema / execute），由 ActionRegistry 按名注册与查找，
//! ActionExecutor 在调用时做参数校验、超时、推送与审计日志。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notify::Notification;

/// 声明给生成后端的动作描述（function calling 的 tools 列表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    /// 参数 JSON Schema（含 required 列表）
    pub parameters: Value,
}

/// 动作成功执行后的产出：回写给模型的简短说明（可选）与一条推送
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub message: Option<String>,
    pub notification: Notification,
}

/// 动作 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为已通过 required 校验的 JSON）
#[async_trait]
pub trait Action: Send + Sync {
    /// 动作名称（tool call 中的 function.name）
    fn name(&self) -> &str;

    /// 动作描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema
    fn parameters_schema(&self) -> Value;

    /// 执行副作用；Err 为单个动作失败，不影响同一轮的其他动作
    async fn execute(&self, args: Value) -> Result<ActionReport, String>;
}

/// 动作注册表：按名称存储 Arc<dyn Action>
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Action + 'static) {
        let name = action.name().to_string();
        self.actions.insert(name, Arc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// 按名称排序，保证每次声明给后端的顺序一致
    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn specs(&self) -> Vec<ActionSpec> {
        self.action_names()
            .into_iter()
            .filter_map(|name| {
                let action = self.actions.get(&name)?;
                Some(ActionSpec {
                    description: action.description().to_string(),
                    parameters: action.parameters_schema(),
                    name,
                })
            })
            .collect()
    }
}
