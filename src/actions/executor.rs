//! 动作执行器
//!
//! 持有 ActionRegistry、通知出口与单次超时。dispatch 对每个请求：未知名称 -> 告警并跳过；
//! 缺必填参数 / 执行失败 / 超时 -> 该动作失败；每个已知动作恰好发起一次推送，并输出结构化审计日志（JSON）。
//! 同一轮的多个请求并发执行，结果按请求顺序返回。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::actions::{validate_arguments, ActionRegistry, ActionSpec};
use crate::memory::ActionRequest;
use crate::notify::{Notification, Notifier};

/// 单个动作的结果；序列化后作为 action-result Turn 的 content 回写给模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failed {
        error: String,
    },
    /// 未知动作：空操作
    Skipped {
        reason: String,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Succeeded { .. } => "ok",
            ActionOutcome::Failed { .. } => "error",
            ActionOutcome::Skipped { .. } => "skipped",
        }
    }

    /// 回写给模型的 JSON 文本
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"status":"{}"}}"#, self.label()))
    }
}

/// 动作执行器
pub struct ActionExecutor {
    registry: ActionRegistry,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry, notifier: Arc<dyn Notifier>, timeout_secs: u64) -> Self {
        Self {
            registry,
            notifier,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn specs(&self) -> Vec<ActionSpec> {
        self.registry.specs()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.registry.action_names()
    }

    /// 并发执行一轮请求，按请求顺序返回结果
    pub async fn dispatch_all(&self, requests: &[ActionRequest]) -> Vec<ActionOutcome> {
        join_all(requests.iter().map(|r| self.dispatch(r))).await
    }

    /// 执行单个请求；永不返回错误，失败体现在 ActionOutcome 中
    pub async fn dispatch(&self, request: &ActionRequest) -> ActionOutcome {
        let start = Instant::now();

        let Some(action) = self.registry.get(&request.name) else {
            tracing::warn!(action = %request.name, "Unknown action requested, skipping");
            let outcome = ActionOutcome::Skipped {
                reason: format!("Unknown action: {}", request.name),
            };
            self.audit(request, &outcome, start);
            return outcome;
        };

        let result = match validate_arguments(&action.parameters_schema(), &request.arguments) {
            Err(e) => Err(e),
            Ok(()) => match timeout(self.timeout, action.execute(request.arguments.clone())).await {
                Ok(r) => r,
                Err(_) => Err(format!("Action timed out after {}s", self.timeout.as_secs())),
            },
        };

        let (outcome, notification) = match result {
            Ok(report) => (
                ActionOutcome::Succeeded {
                    message: report.message,
                },
                report.notification,
            ),
            Err(error) => {
                tracing::warn!(action = %request.name, error = %error, "Action failed");
                let notification =
                    Notification::new("Action Failed", format!("{}: {}", request.name, error));
                (ActionOutcome::Failed { error }, notification)
            }
        };

        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::error!(action = %request.name, "push failed: {}", e);
        }
        self.audit(request, &outcome, start);
        outcome
    }

    fn audit(&self, request: &ActionRequest, outcome: &ActionOutcome, start: Instant) {
        let audit = serde_json::json!({
            "event": "action_audit",
            "action": request.name,
            "request_id": request.id,
            "ok": outcome.is_success(),
            "outcome": outcome.label(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&request.arguments),
        });
        tracing::info!(audit = %audit, "action");
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
