//! Plain-text bodies for meeting invitations and reminders.

use chrono::{DateTime, Local, Utc};

use crate::google::types::{MeetingCreated, MeetingDetails};

const FOOTER_RULE: &str = "---";

/// Render an RFC 3339 timestamp in local time, or echo it when unparsable
fn display_time(time: Option<&str>) -> String {
    match time {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Local).format("%b %-d, %Y, %-I:%M %p").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "Unknown".to_string(),
    }
}

fn with_custom_message(custom_message: &str, rest: String) -> String {
    if custom_message.is_empty() {
        rest
    } else {
        format!("{}\n\n{}", custom_message, rest)
    }
}

fn link(meet_link: Option<&str>) -> &str {
    meet_link.unwrap_or("(no Meet link available)")
}

/// Full invitation for a scheduled meeting
pub fn meeting_invitation(meeting: &MeetingCreated, custom_message: &str) -> String {
    let event = &meeting.event;
    let mut body = format!(
        "Meeting Details:\n📅 {}\n🕐 {} - {}\n\n🎥 Join Google Meet:\n{}\n\n📋 Calendar Event:\n{}\n",
        event.title.as_deref().unwrap_or(""),
        display_time(event.start_time.as_deref()),
        display_time(event.end_time.as_deref()),
        link(meeting.meet_link.as_deref()),
        meeting.calendar_link.as_deref().unwrap_or(""),
    );
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        body.push_str(&format!("\nDescription:\n{}\n", description));
    }
    body.push_str(&format!(
        "\n{}\nThis meeting was created automatically via MCP server.",
        FOOTER_RULE
    ));

    with_custom_message(custom_message, body)
}

/// Invitation for a meeting starting in a few minutes
pub fn quick_meet_invitation(meeting: &MeetingCreated, custom_message: &str) -> String {
    let body = format!(
        "Hi! I've set up a quick meeting for us.\n\n📅 {}\n🕐 Starting at: {}\n\n🎥 Join the meeting:\n{}\n\nThe meeting starts in a few minutes. See you there!\n\n{}\nQuick meeting created via MCP server.",
        meeting.event.title.as_deref().unwrap_or(""),
        display_time(meeting.event.start_time.as_deref()),
        link(meeting.meet_link.as_deref()),
        FOOTER_RULE,
    );

    with_custom_message(custom_message, body)
}

/// Invitation to join right now
pub fn instant_meet_invitation(meeting: &MeetingCreated, custom_message: &str) -> String {
    let body = format!(
        "Join me for a quick meeting right now!\n\n🎥 Click here to join:\n{}\n\n📅 Meeting: {}\n\nI'll be waiting in the meeting room. Join when you're ready!\n\n{}\nInstant meeting created via MCP server.",
        link(meeting.meet_link.as_deref()),
        meeting.event.title.as_deref().unwrap_or(""),
        FOOTER_RULE,
    );

    with_custom_message(custom_message, body)
}

/// Whole minutes from `now` until the meeting starts, rounded; 0 if unknown
pub fn minutes_until(start_time: Option<&str>, now: DateTime<Utc>) -> i64 {
    start_time
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|start| {
            let millis = (start.with_timezone(&Utc) - now).num_milliseconds();
            (millis as f64 / 60_000.0).round() as i64
        })
        .unwrap_or(0)
}

/// Reminder sent to each attendee of an existing meeting
pub fn reminder(meeting: &MeetingDetails, reminder_message: &str, minutes_until: i64) -> String {
    let when = if minutes_until > 0 {
        format!("in {} minutes", minutes_until)
    } else {
        "now".to_string()
    };

    let body = format!(
        "Reminder: Meeting starting {}!\n\n📅 {}\n🕐 {}\n\n🎥 Join Google Meet:\n{}\n\nSee you there!\n\n{}\nReminder sent via MCP server.",
        when,
        meeting.title.as_deref().unwrap_or(""),
        display_time(meeting.start_time.as_deref()),
        link(meeting.meet_link.as_deref()),
        FOOTER_RULE,
    );

    with_custom_message(reminder_message, body)
}
