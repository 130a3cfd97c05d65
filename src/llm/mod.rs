//! LLM 层：生成后端与评审客户端（OpenAI 兼容 / DeepSeek / Mock）

pub mod chat;
pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

pub use chat::{ChatBackend, OPENAI_BASE_URL};
pub use deepseek::{create_deepseek_backend, create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use mock::{EchoBackend, MockLlmClient, ScriptedBackend, ScriptedLlm};
pub use openai::OpenAiClient;
pub use traits::{Generation, GenerationBackend, LlmClient};
