//! Typed tool arguments.
//!
//! Each struct is both the parser for a tool's arguments and the source of
//! its advertised input schema. Doc comments become field descriptions.

use schemars::JsonSchema;
use serde::Deserialize;

fn default_max_results() -> u32 {
    10
}

fn default_days() -> u32 {
    30
}

fn default_message_list_visibility() -> String {
    "show".to_string()
}

fn default_label_list_visibility() -> String {
    "labelShow".to_string()
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

fn default_role() -> String {
    "reader".to_string()
}

fn default_permission_type() -> String {
    "user".to_string()
}

fn default_duration_minutes() -> i64 {
    60
}

fn default_instant_title() -> String {
    "Instant Meeting".to_string()
}

fn default_share_subject() -> String {
    "Join me for a quick meeting".to_string()
}

/// Tools that take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

// ==================== Gmail ====================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchEmailsArgs {
    /// Gmail search query (e.g., "from:john@company.com")
    pub query: String,

    /// Maximum number of results to return
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailIdArgs {
    /// Gmail message ID
    pub email_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendEmailArgs {
    /// Recipient, e.g. "bob@example.com" or "Bob <bob@example.com>"; separate several with commas
    pub to: String,

    /// Email subject
    pub subject: String,

    /// Email body content
    pub body: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelArgs {
    /// Label name
    pub name: String,

    /// Message list visibility (show/hide)
    #[serde(default = "default_message_list_visibility")]
    pub message_list_visibility: String,

    /// Label list visibility (labelShow/labelHide)
    #[serde(default = "default_label_list_visibility")]
    pub label_list_visibility: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalyzeEmailPatternsArgs {
    /// Number of days to analyze
    #[serde(default = "default_days")]
    pub days: u32,
}

// ==================== Drive ====================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchDriveFilesArgs {
    /// Drive search query (e.g., "name contains 'report'")
    pub query: String,

    /// Maximum number of results
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileIdArgs {
    /// Google Drive file ID
    pub file_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileArgs {
    /// File name
    pub name: String,

    /// File content
    pub content: String,

    /// MIME type of the file
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Parent folder ID (optional)
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileArgs {
    /// Google Drive file ID
    pub file_id: String,

    /// New file content
    pub content: String,

    /// MIME type of the file
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderArgs {
    /// Folder name
    pub name: String,

    /// Parent folder ID (optional)
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopyFileArgs {
    /// Source file ID
    pub file_id: String,

    /// Name for the copied file
    pub name: String,

    /// Parent folder ID (optional)
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveFileArgs {
    /// File ID to move
    pub file_id: String,

    /// New parent folder ID
    pub new_parent_id: String,

    /// Parent IDs to remove (optional)
    #[serde(default)]
    pub remove_parents: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileArgs {
    /// File ID to share
    pub file_id: String,

    /// Email address to share with
    pub email: String,

    /// Permission role (reader/writer/owner)
    #[serde(default = "default_role")]
    pub role: String,

    /// Permission type (user/group/domain/anyone)
    #[serde(rename = "type", default = "default_permission_type")]
    pub permission_type: String,
}

// ==================== Calendar ====================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingArgs {
    /// Meeting title
    pub title: String,

    /// Start time in ISO format (e.g., "2024-01-15T14:00:00.000Z")
    pub start_time: String,

    /// End time in ISO format (e.g., "2024-01-15T15:00:00.000Z")
    pub end_time: String,

    /// Array of attendee email addresses
    #[serde(default)]
    pub attendees: Vec<String>,

    /// Meeting description
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuickMeetArgs {
    /// Meeting title
    pub title: String,

    /// Meeting duration in minutes
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,

    /// Array of attendee email addresses
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateInstantMeetArgs {
    /// Meeting title
    #[serde(default = "default_instant_title")]
    pub title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventIdArgs {
    /// Google Calendar event ID
    pub event_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListUpcomingMeetingsArgs {
    /// Maximum number of meetings to return
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

// ==================== Workflows ====================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetAndSendArgs {
    /// Recipient email address
    pub to: String,

    /// Email subject
    pub subject: String,

    /// Meeting title
    pub meeting_title: String,

    /// Start time in ISO format
    pub start_time: String,

    /// End time in ISO format
    pub end_time: String,

    /// Custom message to include in email
    #[serde(default)]
    pub custom_message: String,

    /// Additional attendee email addresses
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuickMeetAndSendArgs {
    /// Recipient email address
    pub to: String,

    /// Email subject and meeting title
    pub subject: String,

    /// Meeting duration in minutes
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,

    /// Custom message to include in email
    #[serde(default)]
    pub custom_message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstantMeetAndShareArgs {
    /// Array of recipient email addresses
    pub recipients: Vec<String>,

    /// Email subject and meeting title
    #[serde(default = "default_share_subject")]
    pub subject: String,

    /// Custom message to include in email
    #[serde(default)]
    pub custom_message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMeetReminderArgs {
    /// Google Calendar event ID
    pub event_id: String,

    /// Custom reminder message
    #[serde(default)]
    pub reminder_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_apply() {
        let args: SearchEmailsArgs = serde_json::from_value(json!({"query": "is:unread"})).unwrap();
        assert_eq!(args.max_results, 10);

        let args: ShareFileArgs =
            serde_json::from_value(json!({"fileId": "f1", "email": "a@example.com"})).unwrap();
        assert_eq!(args.role, "reader");
        assert_eq!(args.permission_type, "user");

        let args: CreateInstantMeetAndShareArgs =
            serde_json::from_value(json!({"recipients": ["a@example.com"]})).unwrap();
        assert_eq!(args.subject, "Join me for a quick meeting");
    }

    #[test]
    fn test_camel_case_names() {
        let args: MoveFileArgs = serde_json::from_value(
            json!({"fileId": "f1", "newParentId": "p2", "removeParents": "p1"}),
        )
        .unwrap();
        assert_eq!(args.new_parent_id, "p2");
        assert_eq!(args.remove_parents.as_deref(), Some("p1"));
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let err = serde_json::from_value::<SendEmailArgs>(json!({"to": "a@example.com"})).unwrap_err();
        assert!(err.to_string().contains("subject"));
    }
}
