//! Tool dispatch: authentication gate, lookup, argument decoding, routing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::envelope::{into_value, Envelope, ToolFailure};
use crate::error::{AuthError, McpError};
use crate::google::NewMeeting;
use crate::mcp::args::*;
use crate::mcp::catalog::ToolName;
use crate::mcp::types::CallToolResult;
use crate::registry::ServiceRegistry;
use crate::workflow::MeetAndSend;

/// Fixed reply when the session cannot be verified
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed.";

/// Routes tool calls to the services once authentication has succeeded
pub struct ToolDispatcher {
    authenticator: Arc<Authenticator>,
    config: Config,
    http_client: reqwest::Client,
    registry: OnceCell<ServiceRegistry>,
}

impl ToolDispatcher {
    pub fn new(authenticator: Arc<Authenticator>, config: Config) -> Self {
        Self {
            authenticator,
            config,
            http_client: reqwest::Client::new(),
            registry: OnceCell::new(),
        }
    }

    /// Authenticate ahead of the first call. Failure is logged, not fatal.
    pub async fn warm_up(&self) {
        match self.registry().await {
            Ok(_) => tracing::info!("Authenticated, services ready"),
            Err(e) => tracing::warn!(
                "Authentication not available yet ({}); run the `auth` command to connect an account",
                e
            ),
        }
    }

    /// Run one tool call. Never panics and never returns a raw error.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> CallToolResult {
        let registry = match self.registry().await {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!("Tool {} rejected: {}", name, e);
                return CallToolResult::error(AUTH_FAILED_MESSAGE);
            }
        };

        let Some(tool) = ToolName::parse(name) else {
            tracing::debug!("Unknown tool requested: {}", name);
            return CallToolResult::error(
                McpError::UnknownTool {
                    name: name.to_string(),
                }
                .to_string(),
            );
        };

        tracing::debug!("Dispatching {}", name);
        let outcome = AssertUnwindSafe(route(registry, tool, arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let detail = panic_message(panic.as_ref());
                tracing::error!("Tool {} panicked: {}", name, detail);
                Err(ToolFailure::new(format!("Tool {} failed unexpectedly: {}", name, detail)))
            });

        if let Err(failure) = &outcome {
            tracing::debug!("Tool {} failed: {}", name, failure);
        }
        CallToolResult::from_envelope(outcome)
    }

    async fn registry(&self) -> Result<&ServiceRegistry, AuthError> {
        self.registry
            .get_or_try_init(|| async {
                let session = self.authenticator.initialize().await?;
                Ok::<_, AuthError>(ServiceRegistry::new(
                    session,
                    &self.config,
                    self.http_client.clone(),
                ))
            })
            .await
    }
}

/// Decode arguments; a missing bag counts as `{}`
fn parse<T: DeserializeOwned>(arguments: Value) -> Envelope<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| {
        ToolFailure::new(
            McpError::InvalidArguments {
                message: e.to_string(),
            }
            .to_string(),
        )
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn route(registry: &ServiceRegistry, tool: ToolName, arguments: Value) -> Envelope<Value> {
    let gmail = &registry.gmail;
    let drive = &registry.drive;
    let calendar = &registry.calendar;
    let workflows = &registry.workflows;

    match tool {
        // Gmail
        ToolName::SearchEmails => {
            let a: SearchEmailsArgs = parse(arguments)?;
            into_value(gmail.search_emails(&a.query, a.max_results).await)
        }
        ToolName::GetEmailContent => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.get_email_content(&a.email_id).await)
        }
        ToolName::SendEmail => {
            let a: SendEmailArgs = parse(arguments)?;
            into_value(gmail.send_email(&a.to, &a.subject, &a.body).await)
        }
        ToolName::DeleteEmail => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.delete_email(&a.email_id).await)
        }
        ToolName::MarkEmailRead => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.mark_email_read(&a.email_id).await)
        }
        ToolName::MarkEmailUnread => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.mark_email_unread(&a.email_id).await)
        }
        ToolName::ArchiveEmail => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.archive_email(&a.email_id).await)
        }
        ToolName::StarEmail => {
            let a: EmailIdArgs = parse(arguments)?;
            into_value(gmail.star_email(&a.email_id).await)
        }
        ToolName::GetLabels => {
            let _: NoArgs = parse(arguments)?;
            into_value(gmail.get_labels().await)
        }
        ToolName::CreateLabel => {
            let a: CreateLabelArgs = parse(arguments)?;
            into_value(
                gmail
                    .create_label(&a.name, &a.message_list_visibility, &a.label_list_visibility)
                    .await,
            )
        }
        ToolName::AnalyzeEmailPatterns => {
            let a: AnalyzeEmailPatternsArgs = parse(arguments)?;
            into_value(gmail.analyze_email_patterns(a.days).await)
        }

        // Drive
        ToolName::SearchDriveFiles => {
            let a: SearchDriveFilesArgs = parse(arguments)?;
            into_value(drive.search_drive_files(&a.query, a.max_results).await)
        }
        ToolName::GetFileContent => {
            let a: FileIdArgs = parse(arguments)?;
            into_value(drive.get_file_content(&a.file_id).await)
        }
        ToolName::CreateFile => {
            let a: CreateFileArgs = parse(arguments)?;
            into_value(
                drive
                    .create_file(&a.name, &a.content, &a.mime_type, a.parent_id.as_deref())
                    .await,
            )
        }
        ToolName::UpdateFile => {
            let a: UpdateFileArgs = parse(arguments)?;
            into_value(drive.update_file(&a.file_id, &a.content, &a.mime_type).await)
        }
        ToolName::DeleteFile => {
            let a: FileIdArgs = parse(arguments)?;
            into_value(drive.delete_file(&a.file_id).await)
        }
        ToolName::CreateFolder => {
            let a: CreateFolderArgs = parse(arguments)?;
            into_value(drive.create_folder(&a.name, a.parent_id.as_deref()).await)
        }
        ToolName::CopyFile => {
            let a: CopyFileArgs = parse(arguments)?;
            into_value(drive.copy_file(&a.file_id, &a.name, a.parent_id.as_deref()).await)
        }
        ToolName::MoveFile => {
            let a: MoveFileArgs = parse(arguments)?;
            into_value(
                drive
                    .move_file(&a.file_id, &a.new_parent_id, a.remove_parents.as_deref())
                    .await,
            )
        }
        ToolName::ShareFile => {
            let a: ShareFileArgs = parse(arguments)?;
            into_value(
                drive
                    .share_file(&a.file_id, &a.email, &a.role, &a.permission_type)
                    .await,
            )
        }
        ToolName::GetFilePermissions => {
            let a: FileIdArgs = parse(arguments)?;
            into_value(drive.get_file_permissions(&a.file_id).await)
        }

        // Calendar
        ToolName::CreateMeeting => {
            let a: CreateMeetingArgs = parse(arguments)?;
            let meeting = NewMeeting {
                title: a.title,
                start_time: a.start_time,
                end_time: a.end_time,
                attendees: a.attendees,
                description: a.description,
            };
            into_value(calendar.create_meeting(meeting).await)
        }
        ToolName::CreateQuickMeet => {
            let a: CreateQuickMeetArgs = parse(arguments)?;
            into_value(
                calendar
                    .create_quick_meet(&a.title, a.duration_minutes, a.attendees)
                    .await,
            )
        }
        ToolName::CreateInstantMeet => {
            let a: CreateInstantMeetArgs = parse(arguments)?;
            into_value(calendar.create_instant_meet(&a.title).await)
        }
        ToolName::GetMeetingDetails => {
            let a: EventIdArgs = parse(arguments)?;
            into_value(calendar.get_meeting_details(&a.event_id).await)
        }
        ToolName::ListUpcomingMeetings => {
            let a: ListUpcomingMeetingsArgs = parse(arguments)?;
            into_value(calendar.list_upcoming_meetings(a.max_results).await)
        }

        // Workflows
        ToolName::CreateMeetAndSend => {
            let a: CreateMeetAndSendArgs = parse(arguments)?;
            let request = MeetAndSend {
                to: a.to,
                subject: a.subject,
                meeting_title: a.meeting_title,
                start_time: a.start_time,
                end_time: a.end_time,
                custom_message: a.custom_message,
                attendees: a.attendees,
            };
            into_value(workflows.create_meet_and_send(request).await)
        }
        ToolName::CreateQuickMeetAndSend => {
            let a: CreateQuickMeetAndSendArgs = parse(arguments)?;
            into_value(
                workflows
                    .create_quick_meet_and_send(&a.to, &a.subject, a.duration_minutes, &a.custom_message)
                    .await,
            )
        }
        ToolName::CreateInstantMeetAndShare => {
            let a: CreateInstantMeetAndShareArgs = parse(arguments)?;
            into_value(
                workflows
                    .create_instant_meet_and_share(&a.recipients, &a.subject, &a.custom_message)
                    .await,
            )
        }
        ToolName::SendMeetReminder => {
            let a: SendMeetReminderArgs = parse(arguments)?;
            into_value(
                workflows
                    .send_meet_reminder(&a.event_id, &a.reminder_message)
                    .await,
            )
        }
    }
}
