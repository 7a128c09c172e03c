//! Wire types for the Gmail, Drive and Calendar APIs, and the result shapes
//! the services hand back to tool callers.
//!
//! Fields the services never interpret (labels, Drive file resources,
//! permissions) stay as [`serde_json::Value`] and pass straight through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==================== Gmail ====================

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePartBody {
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message as returned by `messages.get`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    #[serde(default)]
    pub thread_id: Option<String>,

    #[serde(default)]
    pub snippet: Option<String>,

    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// Response of `messages.list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    #[serde(default)]
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub raw: String,
}

/// Label edits for `messages.modify`
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMessageRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LabelList {
    #[serde(default)]
    pub labels: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub name: String,
    pub message_list_visibility: String,
    pub label_list_visibility: String,
}

/// One row of a search result
#[derive(Debug, Clone, Serialize)]
pub struct EmailSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEmailsResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u32>,
    pub emails: Vec<EmailSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailContent {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResult {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub message: String,
}

/// Outcome of a single-message mutation (delete, label edits)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageActionResult {
    pub message_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelsResult {
    pub labels: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateLabelResult {
    pub label: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderCount {
    pub sender: String,
    pub count: u32,
}

/// Sender and time-of-day statistics over recent mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPatterns {
    pub total_emails: usize,
    pub analyzed_emails: usize,
    pub top_senders: Vec<SenderCount>,
    pub hourly_pattern: Vec<u32>,
    pub busiest_hour: usize,
}

// ==================== Drive ====================

#[derive(Debug, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<Value>,
}

/// The metadata `get_file_content` needs to decide how to read a file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionList {
    #[serde(default)]
    pub permissions: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFilesResult {
    pub files: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContentResult {
    pub file: FileMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A Drive file resource plus a confirmation line
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: Value,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderResult {
    pub folder: Value,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResult {
    pub file_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareFileResult {
    pub permission: Value,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionsResult {
    pub permissions: Vec<Value>,
}

// ==================== Calendar ====================

/// Start or end of an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// All-day events carry a date instead of a date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Event attendee; response status and the like pass through untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(default)]
    pub entry_point_type: Option<String>,

    #[serde(default)]
    pub uri: Option<String>,
}

/// A calendar event as returned by `events.insert` / `events.get`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub start: EventTime,

    #[serde(default)]
    pub end: EventTime,

    #[serde(default)]
    pub attendees: Vec<Attendee>,

    #[serde(default)]
    pub html_link: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub conference_data: Option<ConferenceData>,
}

impl Event {
    /// URI of the video entry point, i.e. the Meet link
    pub fn meet_link(&self) -> Option<String> {
        self.conference_data
            .as_ref()?
            .entry_points
            .iter()
            .find(|e| e.entry_point_type.as_deref() == Some("video"))
            .and_then(|e| e.uri.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

/// The event part of a [`MeetingCreated`]
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A freshly created meeting with its Meet link
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingCreated {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_link: Option<String>,
    pub event: MeetingEvent,
    pub message: String,
}

impl From<Event> for MeetingCreated {
    fn from(event: Event) -> Self {
        let meet_link = event.meet_link();
        Self {
            event_id: event.id,
            meet_link,
            calendar_link: event.html_link,
            event: MeetingEvent {
                title: event.summary,
                start_time: event.start.date_time,
                end_time: event.end.date_time,
                attendees: event.attendees,
                description: event.description,
            },
            message: "Meeting created successfully with Google Meet link".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetails {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<Event> for MeetingDetails {
    fn from(event: Event) -> Self {
        let meet_link = event.meet_link();
        Self {
            event_id: event.id,
            title: event.summary,
            start_time: event.start.date_time,
            end_time: event.end.date_time,
            meet_link,
            attendees: event.attendees,
            description: event.description,
            status: event.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<Event> for MeetingSummary {
    fn from(event: Event) -> Self {
        let meet_link = event.meet_link();
        Self {
            event_id: event.id,
            title: event.summary,
            start_time: event.start.date_time,
            end_time: event.end.date_time,
            meet_link,
            attendees: event.attendees,
            status: event.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingMeetings {
    pub meetings: Vec<MeetingSummary>,
    pub count: usize,
}
