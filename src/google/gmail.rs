//! Gmail API service
//!
//! Every operation returns an [`Envelope`]; failures carry a fixed
//! per-operation prefix followed by Google's own message.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Timelike;
use reqwest::Method;

use crate::envelope::{wrap, Envelope};
use crate::error::Result;
use crate::google::api::GoogleApi;
use crate::google::message::{build_message, encode_raw_message, extract_body, find_header};
use crate::google::types::*;
use crate::workflow::MailSender;

/// Messages listed by `analyze_email_patterns`
const ANALYSIS_LIST_LIMIT: u32 = 1000;

/// Messages actually fetched and analyzed
const ANALYSIS_SAMPLE: usize = 100;

const TOP_SENDERS: usize = 10;

pub struct GmailService {
    api: GoogleApi,
}

impl GmailService {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    fn messages_url(&self) -> String {
        format!("{}/users/me/messages", self.api.endpoints().gmail)
    }

    fn message_url(&self, id: &str) -> String {
        format!("{}/{}", self.messages_url(), urlencoding::encode(id))
    }

    fn labels_url(&self) -> String {
        format!("{}/users/me/labels", self.api.endpoints().gmail)
    }

    // ==================== Reading ====================

    /// Search with Gmail query syntax and summarize each hit
    pub async fn search_emails(&self, query: &str, max_results: u32) -> Envelope<SearchEmailsResult> {
        wrap(self.try_search_emails(query, max_results).await, "Gmail search failed")
    }

    async fn try_search_emails(&self, query: &str, max_results: u32) -> Result<SearchEmailsResult> {
        let list = self.list_messages(query, max_results).await?;

        let mut emails = Vec::with_capacity(list.messages.len());
        for message_ref in &list.messages {
            let message = self
                .get_metadata(&message_ref.id, &["From", "Subject", "Date"])
                .await?;
            let payload = message.payload.unwrap_or_default();

            emails.push(EmailSummary {
                id: message_ref.id.clone(),
                from: find_header(&payload, "From").unwrap_or("Unknown").to_string(),
                subject: find_header(&payload, "Subject").unwrap_or("No Subject").to_string(),
                date: find_header(&payload, "Date").unwrap_or("Unknown").to_string(),
                snippet: message.snippet,
            });
        }

        tracing::debug!("Gmail search '{}' returned {} messages", query, emails.len());

        Ok(SearchEmailsResult {
            total_results: list.result_size_estimate,
            emails,
        })
    }

    /// Headers and plain-text body of one message
    pub async fn get_email_content(&self, email_id: &str) -> Envelope<EmailContent> {
        wrap(self.try_get_email_content(email_id).await, "Failed to get email content")
    }

    async fn try_get_email_content(&self, email_id: &str) -> Result<EmailContent> {
        let request = self
            .api
            .request(Method::GET, &self.message_url(email_id))
            .query(&[("format", "full")]);
        let message: Message = self.api.json(request).await?;
        let payload = message.payload.unwrap_or_default();

        Ok(EmailContent {
            id: email_id.to_string(),
            from: find_header(&payload, "From").unwrap_or("Unknown").to_string(),
            subject: find_header(&payload, "Subject").unwrap_or("No Subject").to_string(),
            date: find_header(&payload, "Date").unwrap_or("Unknown").to_string(),
            body: extract_body(&payload),
        })
    }

    /// Sender ranking and hour-of-day histogram over the last `days` days
    pub async fn analyze_email_patterns(&self, days: u32) -> Envelope<EmailPatterns> {
        wrap(self.try_analyze_email_patterns(days).await, "Email analysis failed")
    }

    async fn try_analyze_email_patterns(&self, days: u32) -> Result<EmailPatterns> {
        let list = self
            .list_messages(&format!("newer_than:{}d", days), ANALYSIS_LIST_LIMIT)
            .await?;

        let mut samples = Vec::new();
        for message_ref in list.messages.iter().take(ANALYSIS_SAMPLE) {
            let message = self.get_metadata(&message_ref.id, &["From", "Date"]).await?;
            let payload = message.payload.unwrap_or_default();

            let from = find_header(&payload, "From").unwrap_or("Unknown").to_string();
            let hour = find_header(&payload, "Date").and_then(local_hour);
            samples.push((from, hour));
        }

        Ok(summarize_patterns(list.messages.len(), &samples))
    }

    pub async fn get_labels(&self) -> Envelope<LabelsResult> {
        wrap(self.try_get_labels().await, "Failed to get labels")
    }

    async fn try_get_labels(&self) -> Result<LabelsResult> {
        let list: LabelList = self
            .api
            .json(self.api.request(Method::GET, &self.labels_url()))
            .await?;
        Ok(LabelsResult { labels: list.labels })
    }

    // ==================== Writing ====================

    /// Send a plain-text message from the authenticated account
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Envelope<SendEmailResult> {
        wrap(self.try_send_email(to, subject, body).await, "Failed to send email")
    }

    async fn try_send_email(&self, to: &str, subject: &str, body: &str) -> Result<SendEmailResult> {
        let raw = build_message(to, subject, body)?;
        let request = SendMessageRequest {
            raw: encode_raw_message(&raw),
        };

        let url = format!("{}/send", self.messages_url());
        let sent: Message = self
            .api
            .json(self.api.request(Method::POST, &url).json(&request))
            .await?;

        tracing::info!("Email sent to {} ({})", to, sent.id);

        Ok(SendEmailResult {
            message_id: sent.id,
            thread_id: sent.thread_id,
            message: "Email sent successfully".to_string(),
        })
    }

    /// Permanently delete a message, bypassing trash
    pub async fn delete_email(&self, email_id: &str) -> Envelope<MessageActionResult> {
        let result = self
            .api
            .send(self.api.request(Method::DELETE, &self.message_url(email_id)))
            .await
            .map(|()| action_result(email_id, "Email deleted successfully"));
        wrap(result, "Failed to delete email")
    }

    pub async fn mark_email_read(&self, email_id: &str) -> Envelope<MessageActionResult> {
        let edit = ModifyMessageRequest {
            remove_label_ids: vec!["UNREAD".to_string()],
            ..Default::default()
        };
        let result = self.modify(email_id, &edit, "Email marked as read").await;
        wrap(result, "Failed to mark email as read")
    }

    pub async fn mark_email_unread(&self, email_id: &str) -> Envelope<MessageActionResult> {
        let edit = ModifyMessageRequest {
            add_label_ids: vec!["UNREAD".to_string()],
            ..Default::default()
        };
        let result = self.modify(email_id, &edit, "Email marked as unread").await;
        wrap(result, "Failed to mark email as unread")
    }

    pub async fn archive_email(&self, email_id: &str) -> Envelope<MessageActionResult> {
        let edit = ModifyMessageRequest {
            remove_label_ids: vec!["INBOX".to_string()],
            ..Default::default()
        };
        let result = self.modify(email_id, &edit, "Email archived successfully").await;
        wrap(result, "Failed to archive email")
    }

    pub async fn star_email(&self, email_id: &str) -> Envelope<MessageActionResult> {
        let edit = ModifyMessageRequest {
            add_label_ids: vec!["STARRED".to_string()],
            ..Default::default()
        };
        let result = self.modify(email_id, &edit, "Email starred successfully").await;
        wrap(result, "Failed to star email")
    }

    pub async fn create_label(
        &self,
        name: &str,
        message_list_visibility: &str,
        label_list_visibility: &str,
    ) -> Envelope<CreateLabelResult> {
        let request = CreateLabelRequest {
            name: name.to_string(),
            message_list_visibility: message_list_visibility.to_string(),
            label_list_visibility: label_list_visibility.to_string(),
        };
        let result = self
            .api
            .json(self.api.request(Method::POST, &self.labels_url()).json(&request))
            .await
            .map(|label| CreateLabelResult {
                label,
                message: "Label created successfully".to_string(),
            });
        wrap(result, "Failed to create label")
    }

    // ==================== Helpers ====================

    async fn list_messages(&self, query: &str, max_results: u32) -> Result<MessageList> {
        let request = self
            .api
            .request(Method::GET, &self.messages_url())
            .query(&[("q", query.to_string()), ("maxResults", max_results.to_string())]);
        self.api.json(request).await
    }

    async fn get_metadata(&self, id: &str, headers: &[&str]) -> Result<Message> {
        let mut query = vec![("format", "metadata")];
        query.extend(headers.iter().map(|h| ("metadataHeaders", *h)));

        let request = self
            .api
            .request(Method::GET, &self.message_url(id))
            .query(&query);
        self.api.json(request).await
    }

    async fn modify(
        &self,
        email_id: &str,
        edit: &ModifyMessageRequest,
        confirmation: &str,
    ) -> Result<MessageActionResult> {
        let url = format!("{}/modify", self.message_url(email_id));
        self.api
            .send(self.api.request(Method::POST, &url).json(edit))
            .await?;
        Ok(action_result(email_id, confirmation))
    }
}

#[async_trait]
impl MailSender for GmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Envelope<SendEmailResult> {
        GmailService::send_email(self, to, subject, body).await
    }
}

fn action_result(email_id: &str, message: &str) -> MessageActionResult {
    MessageActionResult {
        message_id: email_id.to_string(),
        message: message.to_string(),
    }
}

/// Local hour of an RFC 2822 `Date` header
fn local_hour(date: &str) -> Option<u32> {
    // Trailing comments such as "(UTC)" are not accepted by the parser.
    let date = match date.find('(') {
        Some(idx) => date[..idx].trim_end(),
        None => date.trim(),
    };
    chrono::DateTime::parse_from_rfc2822(date)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Local).hour())
}

/// Rank senders and bucket send hours.
///
/// Senders are ordered by count, ties keeping first-seen order. The busiest
/// hour is the first hour holding the maximum count.
fn summarize_patterns(total_emails: usize, samples: &[(String, Option<u32>)]) -> EmailPatterns {
    let mut order: Vec<SenderCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut hourly_pattern = vec![0u32; 24];

    for (from, hour) in samples {
        match index.get(from.as_str()) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(from.as_str(), order.len());
                order.push(SenderCount {
                    sender: from.clone(),
                    count: 1,
                });
            }
        }
        if let Some(hour) = hour {
            if let Some(slot) = hourly_pattern.get_mut(*hour as usize) {
                *slot += 1;
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(TOP_SENDERS);

    let max = hourly_pattern.iter().copied().max().unwrap_or(0);
    let busiest_hour = hourly_pattern.iter().position(|&c| c == max).unwrap_or(0);

    EmailPatterns {
        total_emails,
        analyzed_emails: samples.len(),
        top_senders: order,
        hourly_pattern,
        busiest_hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(from: &str, hour: Option<u32>) -> (String, Option<u32>) {
        (from.to_string(), hour)
    }

    #[test]
    fn test_summarize_ranks_senders_with_stable_ties() {
        let samples = vec![
            sample("carol", Some(9)),
            sample("alice", Some(9)),
            sample("bob", Some(14)),
            sample("alice", None),
            sample("bob", Some(14)),
            sample("dave", Some(14)),
        ];
        let patterns = summarize_patterns(250, &samples);

        let ranked: Vec<_> = patterns
            .top_senders
            .iter()
            .map(|s| (s.sender.as_str(), s.count))
            .collect();
        assert_eq!(ranked, vec![("alice", 2), ("bob", 2), ("carol", 1), ("dave", 1)]);
        assert_eq!(patterns.total_emails, 250);
        assert_eq!(patterns.analyzed_emails, 6);
        assert_eq!(patterns.hourly_pattern[14], 3);
        assert_eq!(patterns.busiest_hour, 14);
    }

    #[test]
    fn test_busiest_hour_is_first_maximum() {
        let samples = vec![sample("a", Some(20)), sample("b", Some(3))];
        assert_eq!(summarize_patterns(2, &samples).busiest_hour, 3);
        assert_eq!(summarize_patterns(0, &[]).busiest_hour, 0);
    }

    #[test]
    fn test_top_senders_capped_at_ten() {
        let samples: Vec<_> = (0..15).map(|i| sample(&format!("s{}", i), None)).collect();
        assert_eq!(summarize_patterns(15, &samples).top_senders.len(), 10);
    }

    #[test]
    fn test_local_hour_parses_rfc2822() {
        assert!(local_hour("Tue, 1 Jul 2025 10:52:37 +0200").is_some());
        assert!(local_hour("Tue, 1 Jul 2025 10:52:37 +0000 (UTC)").is_some());
        assert!(local_hour("yesterday").is_none());
    }

    #[test]
    fn test_patterns_serialize_camel_case() {
        let value = serde_json::to_value(summarize_patterns(1, &[sample("a", Some(1))])).unwrap();
        assert_eq!(value["busiestHour"], 1);
        assert_eq!(value["hourlyPattern"].as_array().unwrap().len(), 24);
        assert_eq!(value["topSenders"][0]["sender"], "a");
    }
}
