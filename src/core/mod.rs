//! 核心编排层：错误、回复循环状态、回复控制器

pub mod controller;
pub mod error;
pub mod state;

pub use controller::{ReplyController, ReplyOutcome, RevisionRecord};
pub use error::AgentError;
pub use state::{LoopState, RevisionTracker, Termination, Verdict};
