//! 记忆层：对话 Turn 模型与可注入的对话存储

pub mod conversation;

pub use conversation::{ActionRequest, ConversationMemory, ConversationStore, Message, Role};
