//! record_interview_request：记录面试 / 会议邀请（时间、方式、联系人）并推送

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::actions::{parameters_schema_for, Action, ActionReport};
use crate::notify::Notification;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InterviewRequestArgs {
    /// Proposed date of the interview/meeting (ISO format preferred)
    pub date: String,
    /// Proposed time of the interview/meeting
    pub time: String,
    /// Mode of meeting (e.g., Zoom, Google Meet, phone, in-person)
    pub mode: String,
    /// Contact email for the meeting
    #[serde(rename = "contactEmail")]
    pub contact_email: String,
    /// Contact phone number (optional)
    #[serde(rename = "contactPhone", default)]
    pub contact_phone: Option<String>,
    /// Any additional details provided by the employer (optional)
    #[serde(default)]
    pub notes: Option<String>,
}

impl InterviewRequestArgs {
    fn summary(&self) -> String {
        format!(
            "New interview/meeting request received:\nDate: {}\nTime: {}\nMode: {}\nEmail: {}\nPhone: {}\nNotes: {}",
            self.date,
            self.time,
            self.mode,
            self.contact_email,
            self.contact_phone.as_deref().unwrap_or("N/A"),
            self.notes.as_deref().unwrap_or("N/A"),
        )
    }
}

pub struct RecordInterviewRequest;

#[async_trait]
impl Action for RecordInterviewRequest {
    fn name(&self) -> &str {
        "record_interview_request"
    }

    fn description(&self) -> &str {
        "Log an interview or meeting request, including proposed date/time, mode, and contact info, and push a notification to the owner."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<InterviewRequestArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ActionReport, String> {
        let args: InterviewRequestArgs = serde_json::from_value(args).map_err(|e| e.to_string())?;
        tracing::info!(
            date = %args.date,
            time = %args.time,
            mode = %args.mode,
            email = %args.contact_email,
            "interview request logged"
        );
        Ok(ActionReport {
            message: Some("I noted the details. Thank you, I will follow up as needed.".to_string()),
            notification: Notification::new("Interview Request", args.summary()),
        })
    }
}
