//! record_unknown_question：助理无法回答的问题，转人工并推送

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{parameters_schema_for, Action, ActionReport};
use crate::notify::Notification;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UnknownQuestionArgs {
    /// The question that needs human review
    pub question: String,
}

pub struct RecordUnknownQuestion;

#[async_trait]
impl Action for RecordUnknownQuestion {
    fn name(&self) -> &str {
        "record_unknown_question"
    }

    fn description(&self) -> &str {
        "Log a question the agent can't answer and alert the owner via push notification."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<UnknownQuestionArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ActionReport, String> {
        let args: UnknownQuestionArgs = serde_json::from_value(args).map_err(|e| e.to_string())?;
        tracing::info!(question = %args.question, "unknown question logged");
        Ok(ActionReport {
            message: None,
            notification: Notification::new(
                "Human Intervention Needed",
                format!("The agent couldn't answer:\n\"{}\"", args.question),
            ),
        })
    }
}
