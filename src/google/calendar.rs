//! Google Calendar API service with Meet conferencing

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};

use crate::envelope::{wrap, Envelope, ToolFailure};
use crate::google::api::GoogleApi;
use crate::google::types::*;
use crate::workflow::MeetingPlanner;

/// A meeting to be inserted into the primary calendar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMeeting {
    pub title: String,

    /// RFC 3339 start, e.g. `2025-01-15T10:00:00-05:00`
    pub start_time: String,

    pub end_time: String,
    pub attendees: Vec<String>,
    pub description: String,
}

pub struct CalendarService {
    api: GoogleApi,

    /// Time zone attached to created events
    time_zone: String,
}

impl CalendarService {
    pub fn new(api: GoogleApi, time_zone: impl Into<String>) -> Self {
        Self {
            api,
            time_zone: time_zone.into(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.api.endpoints().calendar)
    }

    /// Insert an event with a Meet conference and invite the attendees
    pub async fn create_meeting(&self, meeting: NewMeeting) -> Envelope<MeetingCreated> {
        let request_id = format!("meet-{}", Utc::now().timestamp_millis());
        let body = event_body(&meeting, &self.time_zone, &request_id);

        let request = self
            .api
            .request(Method::POST, &self.events_url())
            .query(&[("conferenceDataVersion", "1"), ("sendUpdates", "all")])
            .json(&body);

        let result = self.api.json::<Event>(request).await.map(|event| {
            tracing::info!("Created meeting {} ({})", event.id, meeting.title);
            MeetingCreated::from(event)
        });
        wrap(result, "Failed to create meeting")
    }

    /// Meeting starting in five minutes
    pub async fn create_quick_meet(
        &self,
        title: &str,
        duration_minutes: i64,
        attendees: Vec<String>,
    ) -> Envelope<MeetingCreated> {
        let start = Utc::now() + Duration::minutes(5);
        let Some(end) = end_after(start, duration_minutes) else {
            return Err(ToolFailure::new("Failed to create meeting: invalid duration"));
        };

        self.create_meeting(NewMeeting {
            title: title.to_string(),
            start_time: iso(start),
            end_time: iso(end),
            attendees,
            description: "Quick meeting created via MCP server".to_string(),
        })
        .await
    }

    /// One-hour meeting starting in two minutes, no attendees
    pub async fn create_instant_meet(&self, title: &str) -> Envelope<MeetingCreated> {
        let start = Utc::now() + Duration::minutes(2);
        let end = start + Duration::minutes(60);

        self.create_meeting(NewMeeting {
            title: title.to_string(),
            start_time: iso(start),
            end_time: iso(end),
            attendees: Vec::new(),
            description: "Instant meeting - join when ready".to_string(),
        })
        .await
    }

    pub async fn get_meeting_details(&self, event_id: &str) -> Envelope<MeetingDetails> {
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(event_id));
        let result = self
            .api
            .json::<Event>(self.api.request(Method::GET, &url))
            .await
            .map(MeetingDetails::from);
        wrap(result, "Failed to get meeting details")
    }

    /// Upcoming events mentioning a Meet link, soonest first
    pub async fn list_upcoming_meetings(&self, max_results: u32) -> Envelope<UpcomingMeetings> {
        let request = self.api.request(Method::GET, &self.events_url()).query(&[
            ("timeMin", iso(Utc::now())),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("q", "meet.google.com".to_string()),
        ]);

        let result = self.api.json::<EventList>(request).await.map(|list| {
            let meetings: Vec<MeetingSummary> =
                list.items.into_iter().map(MeetingSummary::from).collect();
            UpcomingMeetings {
                count: meetings.len(),
                meetings,
            }
        });
        wrap(result, "Failed to list meetings")
    }
}

#[async_trait]
impl MeetingPlanner for CalendarService {
    async fn create_meeting(&self, meeting: NewMeeting) -> Envelope<MeetingCreated> {
        CalendarService::create_meeting(self, meeting).await
    }

    async fn create_quick_meet(
        &self,
        title: &str,
        duration_minutes: i64,
        attendees: Vec<String>,
    ) -> Envelope<MeetingCreated> {
        CalendarService::create_quick_meet(self, title, duration_minutes, attendees).await
    }

    async fn create_instant_meet(&self, title: &str) -> Envelope<MeetingCreated> {
        CalendarService::create_instant_meet(self, title).await
    }

    async fn get_meeting_details(&self, event_id: &str) -> Envelope<MeetingDetails> {
        CalendarService::get_meeting_details(self, event_id).await
    }
}

/// Millisecond-precision UTC timestamp, `2025-01-15T15:00:00.000Z`
fn iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn event_body(meeting: &NewMeeting, time_zone: &str, request_id: &str) -> Value {
    let attendees: Vec<Value> = meeting
        .attendees
        .iter()
        .map(|email| json!({ "email": email }))
        .collect();

    json!({
        "summary": meeting.title,
        "description": meeting.description,
        "start": { "dateTime": meeting.start_time, "timeZone": time_zone },
        "end": { "dateTime": meeting.end_time, "timeZone": time_zone },
        "attendees": attendees,
        "conferenceData": {
            "createRequest": {
                "requestId": request_id,
                "conferenceSolutionKey": { "type": "hangoutsMeet" }
            }
        },
        "guestsCanModify": false,
        "guestsCanInviteOthers": true,
        "guestsCanSeeOtherGuests": true,
    })
}

/// `start + minutes`, or `None` when the sum leaves chrono's range
fn end_after(start: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(minutes).and_then(|duration| start.checked_add_signed(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_after_rejects_out_of_range_durations() {
        let start = DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(iso(end_after(start, 90).unwrap()), "2025-01-15T11:30:00.000Z");
        assert!(end_after(start, i64::MAX).is_none());
        assert!(end_after(start, 1_000_000_000_000).is_none());
    }

    #[test]
    fn test_event_body_requests_meet_conference() {
        let meeting = NewMeeting {
            title: "Sync".to_string(),
            start_time: "2025-01-15T10:00:00-05:00".to_string(),
            end_time: "2025-01-15T10:30:00-05:00".to_string(),
            attendees: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            description: String::new(),
        };
        let body = event_body(&meeting, "Europe/Berlin", "meet-1");

        assert_eq!(body["summary"], "Sync");
        assert_eq!(body["start"]["timeZone"], "Europe/Berlin");
        assert_eq!(body["attendees"][1]["email"], "b@example.com");
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert_eq!(body["conferenceData"]["createRequest"]["requestId"], "meet-1");
    }

    #[test]
    fn test_iso_is_millisecond_utc() {
        let time = DateTime::parse_from_rfc3339("2025-01-15T10:00:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(iso(time), "2025-01-15T15:00:00.000Z");
    }
}
