//! 通知出口：动作结果的推送通知（Pushover 兼容 JSON Webhook）
//!
//! 发送失败只记日志，永远不上报给回复循环的调用方。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::NotifySection;

pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// 一条推送：简短标题 + 正文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// 通知出口 trait
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), String>;
}

/// Pushover 请求体
#[derive(Debug, Serialize)]
struct PushoverRequest<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
}

/// 通过 HTTP POST 推送到 Pushover 兼容端点
pub struct PushoverNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user: String,
}

impl PushoverNotifier {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, user: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        let req = PushoverRequest {
            token: &self.token,
            user: &self.user,
            title: &notification.title,
            message: &notification.message,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("push API error {}: {}", status, text));
        }
        tracing::info!(title = %notification.title, "push sent");
        Ok(())
    }
}

/// 未配置推送凭据时使用：只写日志
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        tracing::info!(
            title = %notification.title,
            message = %notification.message,
            "notification (push disabled)"
        );
        Ok(())
    }
}

/// 记录全部通知（测试用）；fail=true 时每次都返回错误但仍记录
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        if self.fail {
            Err("notifier unavailable".to_string())
        } else {
            Ok(())
        }
    }
}

/// 根据 [notify] 配置创建通知出口：启用且凭据齐全时为 Pushover，否则退化为日志
pub fn create_notifier_from_config(section: &NotifySection) -> Box<dyn Notifier> {
    if !section.enabled {
        return Box::new(LogNotifier);
    }
    let token = section
        .token
        .clone()
        .or_else(|| std::env::var("PUSHOVER_TOKEN").ok());
    let user = section
        .user
        .clone()
        .or_else(|| std::env::var("PUSHOVER_USER").ok());
    match (token, user) {
        (Some(token), Some(user)) => Box::new(PushoverNotifier::new(
            section.endpoint.clone(),
            token,
            user,
            section.timeout_secs,
        )),
        _ => {
            tracing::warn!("Push notifications enabled but PUSHOVER_TOKEN / PUSHOVER_USER missing, logging only");
            Box::new(LogNotifier)
        }
    }
}
