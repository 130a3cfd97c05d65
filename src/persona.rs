//! 人设上下文：从静态文本文件加载候选人资料，渲染为策略文本（system prompt）
//!
//! 进程内只解析一次（首次调用付出读取成本，之后复用）；文件全部缺失时退化为显式的“无上下文”标记，不报错。

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::prompts::render_template;

/// 没有任何资料文件时使用的占位
pub const NO_CONTEXT_MARKER: &str = "(No CV context available)";

/// 一份资料文档：渲染时的小标题 + 相对 profile_dir 的文件名
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileDocument {
    pub title: String,
    pub file: String,
}

impl ProfileDocument {
    pub fn new(title: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
        }
    }
}

/// 读取资料目录下的文档，按配置顺序拼接为 `=== 标题 ===\n内容`；不存在或读取失败的文档跳过
pub async fn load_profile(dir: &Path, documents: &[ProfileDocument]) -> String {
    let mut parts = Vec::new();
    for doc in documents {
        let path = dir.join(&doc.file);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => parts.push(format!("=== {} ===\n{}", doc.title, text.trim())),
            Err(e) => tracing::debug!("profile document {:?} skipped: {}", path, e),
        }
    }

    if parts.is_empty() {
        tracing::warn!("No profile documents found in {:?}, running without context", dir);
        return NO_CONTEXT_MARKER.to_string();
    }
    parts.join("\n\n")
}

/// 将资料填入模板的 {profile}；模板没有占位时追加在末尾
pub fn render_policy(template: &str, profile: &str) -> String {
    if template.contains("{profile}") {
        render_template(template, &[("profile", profile)]).trim().to_string()
    } else {
        format!("{}\n\n{}", template.trim(), profile)
    }
}

/// 懒加载并缓存的策略文本，可被多个 ReplyController 共享
#[derive(Debug)]
pub struct PersonaContext {
    profile_dir: PathBuf,
    documents: Vec<ProfileDocument>,
    template: String,
    resolved: OnceCell<String>,
}

impl PersonaContext {
    pub fn new(
        profile_dir: impl Into<PathBuf>,
        documents: Vec<ProfileDocument>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            documents,
            template: template.into(),
            resolved: OnceCell::new(),
        }
    }

    /// 已解析好的策略文本（测试或外部注入）
    pub fn from_policy_text(policy: impl Into<String>) -> Self {
        Self {
            profile_dir: PathBuf::new(),
            documents: Vec::new(),
            template: String::new(),
            resolved: OnceCell::from(policy.into()),
        }
    }

    /// 首次调用时读取资料并渲染，之后直接返回缓存
    pub async fn policy_text(&self) -> &str {
        self.resolved
            .get_or_init(|| async {
                let profile = load_profile(&self.profile_dir, &self.documents).await;
                render_policy(&self.template, &profile)
            })
            .await
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }
}
