//! DeepSeek API（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat（支持 function calling，适合生成与评审）

use crate::llm::{ChatBackend, OpenAiClient};

/// DeepSeek API 常量
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

fn deepseek_model(model: Option<&str>) -> String {
    model
        .map(String::from)
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string())
}

/// 创建 DeepSeek 评审客户端
///
/// 模型可通过 `model` 参数或 `DEEPSEEK_MODEL` 环境变量指定
pub fn create_deepseek_client(model: Option<&str>, api_key: Option<&str>) -> OpenAiClient {
    OpenAiClient::new(Some(DEEPSEEK_BASE_URL), &deepseek_model(model), api_key)
}

/// 创建 DeepSeek 生成后端（function calling）
pub fn create_deepseek_backend(
    model: Option<&str>,
    api_key: Option<String>,
    timeout_secs: u64,
) -> ChatBackend {
    ChatBackend::new(DEEPSEEK_BASE_URL, deepseek_model(model), api_key, timeout_secs)
}
