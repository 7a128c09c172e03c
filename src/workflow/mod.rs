//! Multi-step workflows combining Calendar and Gmail.
//!
//! A workflow whose first step fails reports that step's error unchanged.
//! When the meeting exists but the follow-up send fails, the failure carries
//! the meeting as partial data. Fan-out workflows send sequentially and
//! record one outcome per recipient, in input order; individual send
//! failures do not fail the workflow.

pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::envelope::{Envelope, ToolFailure};
use crate::google::calendar::NewMeeting;
use crate::google::types::{MeetingCreated, MeetingDetails, SendEmailResult};

/// Mail side of a workflow
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Envelope<SendEmailResult>;
}

/// Calendar side of a workflow
#[async_trait]
pub trait MeetingPlanner: Send + Sync {
    async fn create_meeting(&self, meeting: NewMeeting) -> Envelope<MeetingCreated>;

    async fn create_quick_meet(
        &self,
        title: &str,
        duration_minutes: i64,
        attendees: Vec<String>,
    ) -> Envelope<MeetingCreated>;

    async fn create_instant_meet(&self, title: &str) -> Envelope<MeetingCreated>;

    async fn get_meeting_details(&self, event_id: &str) -> Envelope<MeetingDetails>;
}

/// Input of [`WorkflowComposer::create_meet_and_send`]
#[derive(Debug, Clone, Default)]
pub struct MeetAndSend {
    pub to: String,
    pub subject: String,
    pub meeting_title: String,
    pub start_time: String,
    pub end_time: String,
    pub custom_message: String,

    /// Extra attendees; `to` is always invited
    pub attendees: Vec<String>,
}

/// A meeting plus the invitation that went out for it
#[derive(Debug, Clone, Serialize)]
pub struct MeetAndSendResult {
    pub meeting: MeetingCreated,
    pub email: SendEmailResult,
    pub message: String,
}

/// Send outcome for one recipient of a fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutResult<M> {
    pub meeting: M,
    pub email_results: Vec<RecipientOutcome>,
    pub message: String,
}

pub struct WorkflowComposer {
    mail: Arc<dyn MailSender>,
    planner: Arc<dyn MeetingPlanner>,
}

impl WorkflowComposer {
    pub fn new(mail: Arc<dyn MailSender>, planner: Arc<dyn MeetingPlanner>) -> Self {
        Self { mail, planner }
    }

    /// Schedule a meeting and email its link to `to`
    pub async fn create_meet_and_send(&self, request: MeetAndSend) -> Envelope<MeetAndSendResult> {
        let mut attendees = Vec::with_capacity(request.attendees.len() + 1);
        attendees.push(request.to.clone());
        attendees.extend(request.attendees);

        let meeting = self
            .planner
            .create_meeting(NewMeeting {
                title: request.meeting_title,
                start_time: request.start_time,
                end_time: request.end_time,
                attendees,
                description: request.custom_message.clone(),
            })
            .await?;

        let body = templates::meeting_invitation(&meeting, &request.custom_message);
        let email = self.send_follow_up(&meeting, &request.to, &request.subject, &body).await?;

        Ok(MeetAndSendResult {
            meeting,
            email,
            message: "Meeting created and email sent successfully".to_string(),
        })
    }

    /// Meeting starting in five minutes, invitation to `to`
    pub async fn create_quick_meet_and_send(
        &self,
        to: &str,
        subject: &str,
        duration_minutes: i64,
        custom_message: &str,
    ) -> Envelope<MeetAndSendResult> {
        let meeting = self
            .planner
            .create_quick_meet(subject, duration_minutes, vec![to.to_string()])
            .await?;

        let body = templates::quick_meet_invitation(&meeting, custom_message);
        let email = self.send_follow_up(&meeting, to, subject, &body).await?;

        Ok(MeetAndSendResult {
            meeting,
            email,
            message: "Quick meeting created and invitation sent".to_string(),
        })
    }

    /// Instant meeting, link sent to every recipient in order
    pub async fn create_instant_meet_and_share(
        &self,
        recipients: &[String],
        subject: &str,
        custom_message: &str,
    ) -> Envelope<FanOutResult<MeetingCreated>> {
        let meeting = self.planner.create_instant_meet(subject).await?;

        let body = templates::instant_meet_invitation(&meeting, custom_message);
        let email_results = self.fan_out(recipients.iter().map(String::as_str), subject, &body).await;

        Ok(FanOutResult {
            meeting,
            email_results,
            message: "Instant meeting created and invitations sent".to_string(),
        })
    }

    /// Remind every attendee of an existing meeting
    pub async fn send_meet_reminder(
        &self,
        event_id: &str,
        reminder_message: &str,
    ) -> Envelope<FanOutResult<MeetingDetails>> {
        let meeting = self.planner.get_meeting_details(event_id).await?;

        let minutes = templates::minutes_until(meeting.start_time.as_deref(), chrono::Utc::now());
        let body = templates::reminder(&meeting, reminder_message, minutes);
        let subject = format!("Reminder: {}", meeting.title.as_deref().unwrap_or(""));

        let recipients: Vec<&str> = meeting
            .attendees
            .iter()
            .filter_map(|a| a.email.as_deref())
            .collect();
        let email_results = self.fan_out(recipients.into_iter(), &subject, &body).await;

        Ok(FanOutResult {
            meeting,
            email_results,
            message: "Meeting reminders sent".to_string(),
        })
    }

    async fn send_follow_up(
        &self,
        meeting: &MeetingCreated,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Envelope<SendEmailResult> {
        self.mail.send_email(to, subject, body).await.map_err(|e| {
            tracing::warn!("Meeting {} created but invitation failed: {}", meeting.event_id, e);
            ToolFailure::with_partial(
                format!("Meeting created but failed to send email: {}", e.message),
                serde_json::to_value(meeting).unwrap_or_default(),
            )
        })
    }

    async fn fan_out<'a>(
        &self,
        recipients: impl Iterator<Item = &'a str>,
        subject: &str,
        body: &str,
    ) -> Vec<RecipientOutcome> {
        let mut outcomes = Vec::new();
        for recipient in recipients {
            let outcome = match self.mail.send_email(recipient, subject, body).await {
                Ok(_) => RecipientOutcome {
                    recipient: recipient.to_string(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    tracing::debug!("Send to {} failed: {}", recipient, e);
                    RecipientOutcome {
                        recipient: recipient.to_string(),
                        success: false,
                        error: Some(e.message),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::google::types::{Attendee, MeetingEvent};

    /// Records every send; fails for addresses in `failing`
    #[derive(Default)]
    struct FakeMail {
        failing: Vec<String>,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeMail {
        fn failing(addresses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                failing: addresses.iter().map(|a| a.to_string()).collect(),
                ..Default::default()
            })
        }

        fn sent_to(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(to, _, _)| to.clone()).collect()
        }
    }

    #[async_trait]
    impl MailSender for FakeMail {
        async fn send_email(&self, to: &str, subject: &str, body: &str) -> Envelope<SendEmailResult> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            if self.failing.iter().any(|f| f == to) {
                return Err(ToolFailure::new(format!("Failed to send email: rejected {}", to)));
            }
            Ok(SendEmailResult {
                message_id: format!("msg-{}", to),
                thread_id: None,
                message: "Email sent successfully".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakePlanner {
        fail: bool,
        created: Mutex<Vec<NewMeeting>>,
        attendees: Vec<String>,
    }

    impl FakePlanner {
        fn meeting(title: &str) -> MeetingCreated {
            MeetingCreated {
                event_id: "evt1".to_string(),
                meet_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
                calendar_link: None,
                event: MeetingEvent {
                    title: Some(title.to_string()),
                    ..Default::default()
                },
                message: "Meeting created successfully with Google Meet link".to_string(),
            }
        }

        fn outcome<T>(&self, value: T) -> Envelope<T> {
            if self.fail {
                Err(ToolFailure::new("Failed to create meeting: quota exceeded"))
            } else {
                Ok(value)
            }
        }
    }

    #[async_trait]
    impl MeetingPlanner for FakePlanner {
        async fn create_meeting(&self, meeting: NewMeeting) -> Envelope<MeetingCreated> {
            let created = Self::meeting(&meeting.title);
            self.created.lock().unwrap().push(meeting);
            self.outcome(created)
        }

        async fn create_quick_meet(
            &self,
            title: &str,
            _duration_minutes: i64,
            attendees: Vec<String>,
        ) -> Envelope<MeetingCreated> {
            self.created.lock().unwrap().push(NewMeeting {
                title: title.to_string(),
                attendees,
                ..Default::default()
            });
            self.outcome(Self::meeting(title))
        }

        async fn create_instant_meet(&self, title: &str) -> Envelope<MeetingCreated> {
            self.outcome(Self::meeting(title))
        }

        async fn get_meeting_details(&self, event_id: &str) -> Envelope<MeetingDetails> {
            self.outcome(MeetingDetails {
                event_id: event_id.to_string(),
                title: Some("Standup".to_string()),
                attendees: self.attendees.iter().map(Attendee::new).collect(),
                ..Default::default()
            })
        }
    }

    fn composer(mail: &Arc<FakeMail>, planner: &Arc<FakePlanner>) -> WorkflowComposer {
        WorkflowComposer::new(mail.clone(), planner.clone())
    }

    fn recipients(list: &[&str]) -> Vec<String> {
        list.iter().map(|r| r.to_string()).collect()
    }

    #[tokio::test]
    async fn test_meet_and_send_invites_recipient_first() {
        let mail = FakeMail::failing(&[]);
        let planner = Arc::new(FakePlanner::default());

        let result = composer(&mail, &planner)
            .create_meet_and_send(MeetAndSend {
                to: "bob@example.com".to_string(),
                subject: "Sync".to_string(),
                meeting_title: "Weekly sync".to_string(),
                custom_message: "See agenda".to_string(),
                attendees: recipients(&["carol@example.com"]),
                ..Default::default()
            })
            .await
            .unwrap();

        let created = planner.created.lock().unwrap()[0].clone();
        assert_eq!(created.attendees, recipients(&["bob@example.com", "carol@example.com"]));
        assert_eq!(created.description, "See agenda");
        assert_eq!(result.email.message_id, "msg-bob@example.com");
        assert_eq!(mail.sent_to(), recipients(&["bob@example.com"]));
    }

    #[tokio::test]
    async fn test_failed_send_carries_meeting_as_partial() {
        let mail = FakeMail::failing(&["bob@example.com"]);
        let planner = Arc::new(FakePlanner::default());

        let failure = composer(&mail, &planner)
            .create_quick_meet_and_send("bob@example.com", "Quick chat", 30, "")
            .await
            .unwrap_err();

        assert_eq!(
            failure.message,
            "Meeting created but failed to send email: Failed to send email: rejected bob@example.com"
        );
        let partial = failure.partial.expect("meeting data");
        assert_eq!(partial["eventId"], "evt1");
        assert_eq!(partial["meetLink"], "https://meet.google.com/abc-defg-hij");
    }

    #[tokio::test]
    async fn test_failed_first_step_reports_its_error_and_sends_nothing() {
        let mail = FakeMail::failing(&[]);
        let planner = Arc::new(FakePlanner {
            fail: true,
            ..Default::default()
        });

        let failure = composer(&mail, &planner)
            .create_meet_and_send(MeetAndSend {
                to: "bob@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(failure.message, "Failed to create meeting: quota exceeded");
        assert!(failure.partial.is_none());
        assert!(mail.sent_to().is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order_and_records_failures() {
        let mail = FakeMail::failing(&["b@example.com"]);
        let planner = Arc::new(FakePlanner::default());

        let result = composer(&mail, &planner)
            .create_instant_meet_and_share(
                &recipients(&["a@example.com", "b@example.com", "c@example.com"]),
                "Join me",
                "",
            )
            .await
            .unwrap();

        let order: Vec<_> = result.email_results.iter().map(|r| r.recipient.as_str()).collect();
        assert_eq!(order, vec!["a@example.com", "b@example.com", "c@example.com"]);
        assert_eq!(
            result.email_results.iter().map(|r| r.success).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert!(result.email_results[1].error.is_some());
        assert_eq!(mail.sent_to(), order);
    }

    #[tokio::test]
    async fn test_fan_out_succeeds_even_when_every_send_fails() {
        let mail = FakeMail::failing(&["a@example.com", "b@example.com"]);
        let planner = Arc::new(FakePlanner::default());

        let result = composer(&mail, &planner)
            .create_instant_meet_and_share(&recipients(&["a@example.com", "b@example.com"]), "Now", "")
            .await
            .unwrap();

        assert!(result.email_results.iter().all(|r| !r.success));
    }

    #[tokio::test]
    async fn test_reminder_goes_to_every_attendee() {
        let mail = FakeMail::failing(&[]);
        let planner = Arc::new(FakePlanner {
            attendees: recipients(&["x@example.com", "y@example.com"]),
            ..Default::default()
        });

        let result = composer(&mail, &planner)
            .send_meet_reminder("evt9", "Starting soon")
            .await
            .unwrap();

        assert_eq!(result.meeting.event_id, "evt9");
        assert_eq!(mail.sent_to(), recipients(&["x@example.com", "y@example.com"]));

        let sent = mail.sent.lock().unwrap();
        assert_eq!(sent[0].1, "Reminder: Standup");
        assert!(sent[0].2.starts_with("Starting soon\n\nReminder: Meeting starting now!"));
    }

    #[test]
    fn test_fan_out_result_shape() {
        let result = FanOutResult {
            meeting: FakePlanner::meeting("t"),
            email_results: vec![RecipientOutcome {
                recipient: "a@example.com".to_string(),
                success: true,
                error: None,
            }],
            message: "ok".to_string(),
        };
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["emailResults"][0]["recipient"], "a@example.com");
        assert!(value["emailResults"][0].get("error").is_none());
    }
}
