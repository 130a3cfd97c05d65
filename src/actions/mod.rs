//! 动作层：有副作用的命名动作（联系人采集、面试记录、转人工）及其注册表与执行器

pub mod contact;
pub mod executor;
pub mod interview;
pub mod registry;
pub mod schema;
pub mod unknown_question;

pub use contact::RecordUserDetails;
pub use executor::{ActionExecutor, ActionOutcome};
pub use interview::RecordInterviewRequest;
pub use registry::{Action, ActionRegistry, ActionReport, ActionSpec};
pub use schema::{parameters_schema_for, required_arguments, validate_arguments};
pub use unknown_question::RecordUnknownQuestion;

/// 注册全部内置动作
pub fn default_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(RecordUserDetails);
    registry.register(RecordUnknownQuestion);
    registry.register(RecordInterviewRequest);
    registry
}
