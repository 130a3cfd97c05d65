//! record_user_details：雇主留下联系方式时记录并推送

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{parameters_schema_for, Action, ActionReport};
use crate::notify::Notification;

/// record_user_details 参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserDetailsArgs {
    /// Employer email address
    pub email: String,
    /// Employer name (optional)
    #[serde(default)]
    pub name: Option<String>,
}

/// 联系方式采集
pub struct RecordUserDetails;

#[async_trait]
impl Action for RecordUserDetails {
    fn name(&self) -> &str {
        "record_user_details"
    }

    fn description(&self) -> &str {
        "Record employer contact details and push a notification when they share an email."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<UserDetailsArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ActionReport, String> {
        let args: UserDetailsArgs = serde_json::from_value(args).map_err(|e| e.to_string())?;
        tracing::info!(email = %args.email, name = ?args.name, "lead captured");
        Ok(ActionReport {
            message: None,
            notification: Notification::new(
                "New Employer Contact",
                format!(
                    "Name: {}\nEmail: {}",
                    args.name.as_deref().unwrap_or("N/A"),
                    args.email
                ),
            ),
        })
    }
}
