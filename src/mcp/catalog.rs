//! The fixed set of tools this server exposes.

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

use crate::mcp::args::*;
use crate::mcp::types::Tool;

/// Every tool name the dispatcher accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchEmails,
    GetEmailContent,
    SendEmail,
    DeleteEmail,
    MarkEmailRead,
    MarkEmailUnread,
    ArchiveEmail,
    StarEmail,
    GetLabels,
    CreateLabel,
    AnalyzeEmailPatterns,
    SearchDriveFiles,
    GetFileContent,
    CreateFile,
    UpdateFile,
    DeleteFile,
    CreateFolder,
    CopyFile,
    MoveFile,
    ShareFile,
    GetFilePermissions,
    CreateMeeting,
    CreateQuickMeet,
    CreateInstantMeet,
    CreateMeetAndSend,
    CreateQuickMeetAndSend,
    CreateInstantMeetAndShare,
    SendMeetReminder,
    GetMeetingDetails,
    ListUpcomingMeetings,
}

impl ToolName {
    /// All tools, in advertised order
    pub const ALL: [ToolName; 30] = [
        ToolName::SearchEmails,
        ToolName::GetEmailContent,
        ToolName::SendEmail,
        ToolName::DeleteEmail,
        ToolName::MarkEmailRead,
        ToolName::MarkEmailUnread,
        ToolName::ArchiveEmail,
        ToolName::StarEmail,
        ToolName::GetLabels,
        ToolName::CreateLabel,
        ToolName::AnalyzeEmailPatterns,
        ToolName::SearchDriveFiles,
        ToolName::GetFileContent,
        ToolName::CreateFile,
        ToolName::UpdateFile,
        ToolName::DeleteFile,
        ToolName::CreateFolder,
        ToolName::CopyFile,
        ToolName::MoveFile,
        ToolName::ShareFile,
        ToolName::GetFilePermissions,
        ToolName::CreateMeeting,
        ToolName::CreateQuickMeet,
        ToolName::CreateInstantMeet,
        ToolName::CreateMeetAndSend,
        ToolName::CreateQuickMeetAndSend,
        ToolName::CreateInstantMeetAndShare,
        ToolName::SendMeetReminder,
        ToolName::GetMeetingDetails,
        ToolName::ListUpcomingMeetings,
    ];

    /// Exact-match lookup
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchEmails => "search_emails",
            ToolName::GetEmailContent => "get_email_content",
            ToolName::SendEmail => "send_email",
            ToolName::DeleteEmail => "delete_email",
            ToolName::MarkEmailRead => "mark_email_read",
            ToolName::MarkEmailUnread => "mark_email_unread",
            ToolName::ArchiveEmail => "archive_email",
            ToolName::StarEmail => "star_email",
            ToolName::GetLabels => "get_labels",
            ToolName::CreateLabel => "create_label",
            ToolName::AnalyzeEmailPatterns => "analyze_email_patterns",
            ToolName::SearchDriveFiles => "search_drive_files",
            ToolName::GetFileContent => "get_file_content",
            ToolName::CreateFile => "create_file",
            ToolName::UpdateFile => "update_file",
            ToolName::DeleteFile => "delete_file",
            ToolName::CreateFolder => "create_folder",
            ToolName::CopyFile => "copy_file",
            ToolName::MoveFile => "move_file",
            ToolName::ShareFile => "share_file",
            ToolName::GetFilePermissions => "get_file_permissions",
            ToolName::CreateMeeting => "create_meeting",
            ToolName::CreateQuickMeet => "create_quick_meet",
            ToolName::CreateInstantMeet => "create_instant_meet",
            ToolName::CreateMeetAndSend => "create_meet_and_send",
            ToolName::CreateQuickMeetAndSend => "create_quick_meet_and_send",
            ToolName::CreateInstantMeetAndShare => "create_instant_meet_and_share",
            ToolName::SendMeetReminder => "send_meet_reminder",
            ToolName::GetMeetingDetails => "get_meeting_details",
            ToolName::ListUpcomingMeetings => "list_upcoming_meetings",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::SearchEmails => "Search Gmail emails with query",
            ToolName::GetEmailContent => "Get full content of a specific email",
            ToolName::SendEmail => "Send an email via Gmail",
            ToolName::DeleteEmail => "Permanently delete a specific email",
            ToolName::MarkEmailRead => "Mark an email as read",
            ToolName::MarkEmailUnread => "Mark an email as unread",
            ToolName::ArchiveEmail => "Archive an email (remove from inbox)",
            ToolName::StarEmail => "Star an email",
            ToolName::GetLabels => "Get all Gmail labels",
            ToolName::CreateLabel => "Create a new Gmail label",
            ToolName::AnalyzeEmailPatterns => "Analyze email patterns and statistics",
            ToolName::SearchDriveFiles => "Search Google Drive files",
            ToolName::GetFileContent => "Get content of a Google Drive file",
            ToolName::CreateFile => "Create a new file in Google Drive",
            ToolName::UpdateFile => "Update content of an existing file",
            ToolName::DeleteFile => "Delete a file from Google Drive",
            ToolName::CreateFolder => "Create a new folder in Google Drive",
            ToolName::CopyFile => "Copy a file in Google Drive",
            ToolName::MoveFile => "Move a file to a different folder",
            ToolName::ShareFile => "Share a file with someone",
            ToolName::GetFilePermissions => "Get permissions for a file",
            ToolName::CreateMeeting => "Create a Google Meet meeting and get the link",
            ToolName::CreateQuickMeet => "Create a quick Google Meet starting in 5 minutes",
            ToolName::CreateInstantMeet => "Create an instant Google Meet starting in 2 minutes",
            ToolName::CreateMeetAndSend => "Create a Google Meet and send invitation email",
            ToolName::CreateQuickMeetAndSend => "Create a quick Google Meet and send invitation email",
            ToolName::CreateInstantMeetAndShare => {
                "Create an instant Google Meet and share with multiple people"
            }
            ToolName::SendMeetReminder => "Send meeting reminder emails to attendees",
            ToolName::GetMeetingDetails => "Get details of a Google Meet meeting",
            ToolName::ListUpcomingMeetings => "List upcoming Google Meet meetings",
        }
    }

    /// JSON schema generated from the tool's argument struct
    pub fn input_schema(self) -> Value {
        match self {
            ToolName::SearchEmails => schema::<SearchEmailsArgs>(),
            ToolName::GetEmailContent
            | ToolName::DeleteEmail
            | ToolName::MarkEmailRead
            | ToolName::MarkEmailUnread
            | ToolName::ArchiveEmail
            | ToolName::StarEmail => schema::<EmailIdArgs>(),
            ToolName::SendEmail => schema::<SendEmailArgs>(),
            ToolName::GetLabels => schema::<NoArgs>(),
            ToolName::CreateLabel => schema::<CreateLabelArgs>(),
            ToolName::AnalyzeEmailPatterns => schema::<AnalyzeEmailPatternsArgs>(),
            ToolName::SearchDriveFiles => schema::<SearchDriveFilesArgs>(),
            ToolName::GetFileContent | ToolName::DeleteFile | ToolName::GetFilePermissions => {
                schema::<FileIdArgs>()
            }
            ToolName::CreateFile => schema::<CreateFileArgs>(),
            ToolName::UpdateFile => schema::<UpdateFileArgs>(),
            ToolName::CreateFolder => schema::<CreateFolderArgs>(),
            ToolName::CopyFile => schema::<CopyFileArgs>(),
            ToolName::MoveFile => schema::<MoveFileArgs>(),
            ToolName::ShareFile => schema::<ShareFileArgs>(),
            ToolName::CreateMeeting => schema::<CreateMeetingArgs>(),
            ToolName::CreateQuickMeet => schema::<CreateQuickMeetArgs>(),
            ToolName::CreateInstantMeet => schema::<CreateInstantMeetArgs>(),
            ToolName::CreateMeetAndSend => schema::<CreateMeetAndSendArgs>(),
            ToolName::CreateQuickMeetAndSend => schema::<CreateQuickMeetAndSendArgs>(),
            ToolName::CreateInstantMeetAndShare => schema::<CreateInstantMeetAndShareArgs>(),
            ToolName::SendMeetReminder => schema::<SendMeetReminderArgs>(),
            ToolName::GetMeetingDetails => schema::<EventIdArgs>(),
            ToolName::ListUpcomingMeetings => schema::<ListUpcomingMeetingsArgs>(),
        }
    }

    pub fn definition(self) -> Tool {
        Tool {
            name: self.as_str().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
        }
    }
}

/// Definitions for `tools/list`
pub fn list_tools() -> Vec<Tool> {
    ToolName::ALL.into_iter().map(ToolName::definition).collect()
}

/// Inline draft-07 schema for `T`, without the meta-schema and title
fn schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();

    let mut value = serde_json::to_value(generator.into_root_schema_for::<T>())
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));

    if let Some(object) = value.as_object_mut() {
        object.remove("title");
        object
            .entry("properties")
            .or_insert_with(|| serde_json::json!({}));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_round_trips() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(list_tools().len(), 30);
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(ToolName::parse("Send_Email").is_none());
        assert!(ToolName::parse("send_email ").is_none());
        assert!(ToolName::parse("launch_rocket").is_none());
    }

    #[test]
    fn test_schema_marks_required_fields() {
        let schema = ToolName::SendEmail.input_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required.len(), 3);
        assert!(required.contains(&"to"));
        assert!(schema["properties"]["to"]["description"]
            .as_str()
            .unwrap()
            .contains("Bob <bob@example.com>"));
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn test_schema_defaults_and_renames() {
        let schema = ToolName::ShareFile.input_schema();
        assert_eq!(schema["properties"]["type"]["default"], "user");
        assert_eq!(schema["properties"]["role"]["default"], "reader");

        let required = schema["required"].as_array().unwrap();
        assert!(!required.iter().any(|r| r == "role"));
    }

    #[test]
    fn test_empty_args_schema_is_object() {
        let schema = ToolName::GetLabels.input_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].as_object().unwrap().is_empty());
    }
}
