//! Outgoing mail composition and incoming message decoding.

use base64::{engine::general_purpose, Engine};
use mail_builder::headers::address::Address;
use mail_builder::MessageBuilder;

use crate::error::{Result, ValidationError};
use crate::google::types::MessagePart;

/// One `To` entry: optional display name and bare address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: String,
}

/// Parse a `To` value: `a@x.com`, `Name <a@x.com>`, or a comma-separated
/// list of either. Every address must be well formed.
pub fn parse_recipients(to: &str) -> Result<Vec<Recipient>> {
    let invalid = || ValidationError::InvalidEmail {
        email: to.to_string(),
    };

    let recipients = split_addresses(to)
        .into_iter()
        .map(parse_recipient)
        .collect::<Option<Vec<_>>>()
        .filter(|list| !list.is_empty())
        .ok_or_else(invalid)?;

    Ok(recipients)
}

fn parse_recipient(entry: &str) -> Option<Recipient> {
    let (name, email) = match (entry.rfind('<'), entry.strip_suffix('>')) {
        (Some(open), Some(inner)) => {
            let name = entry[..open].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| name.to_string());
            (name, inner[open + 1..].trim())
        }
        _ => (None, entry),
    };

    validator::validate_email(email).then(|| Recipient {
        name,
        email: email.to_string(),
    })
}

/// Split on commas outside quotes and angle brackets; blank entries are dropped
fn split_addresses(to: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let (mut quoted, mut angled, mut start) = (false, false, 0);

    for (i, c) in to.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '<' if !quoted => angled = true,
            '>' if !quoted => angled = false,
            ',' if !quoted && !angled => {
                entries.push(&to[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&to[start..]);

    entries
        .into_iter()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}

/// Build a plain-text RFC 822 message
pub fn build_message(to: &str, subject: &str, body: &str) -> Result<String> {
    let mut addresses: Vec<Address> = parse_recipients(to)?
        .into_iter()
        .map(|r| Address::new_address(r.name, r.email))
        .collect();

    let to = if addresses.len() == 1 {
        addresses.remove(0)
    } else {
        Address::new_list(addresses)
    };

    let message = MessageBuilder::new()
        .to(to)
        .subject(subject)
        .text_body(body)
        .write_to_string()?;

    Ok(message)
}

/// Encode a raw message for the Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from the Gmail API, padded or not
pub fn decode_base64url(data: &str) -> Option<String> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Message body: the payload's own data if present, otherwise the first
/// `text/plain` part found depth-first.
pub fn extract_body(payload: &MessagePart) -> String {
    if let Some(text) = part_data(payload) {
        return text;
    }
    find_plain_text(&payload.parts).unwrap_or_default()
}

fn find_plain_text(parts: &[MessagePart]) -> Option<String> {
    parts.iter().find_map(|part| {
        if part.mime_type.as_deref() == Some("text/plain") {
            if let Some(text) = part_data(part) {
                return Some(text);
            }
        }
        find_plain_text(&part.parts)
    })
}

fn part_data(part: &MessagePart) -> Option<String> {
    part.body
        .as_ref()?
        .data
        .as_deref()
        .filter(|d| !d.is_empty())
        .and_then(decode_base64url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkspaceMcpError;
    use crate::google::types::{Header, MessagePartBody};

    fn text_part(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            body: Some(MessagePartBody {
                size: text.len() as i64,
                data: Some(encode_raw_message(text)),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_message_headers() {
        let raw = build_message("bob@example.com", "Hello", "Body text").unwrap();
        assert!(raw.contains("To: <bob@example.com>") || raw.contains("To: bob@example.com"));
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Body text"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let err = build_message("not-an-address", "Hi", "x").unwrap_err();
        assert!(matches!(
            err,
            WorkspaceMcpError::Validation(ValidationError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn test_display_name_recipient_is_accepted() {
        let recipients = parse_recipients("Bob Smith <bob@example.com>").unwrap();
        assert_eq!(
            recipients,
            vec![Recipient {
                name: Some("Bob Smith".to_string()),
                email: "bob@example.com".to_string(),
            }]
        );

        let raw = build_message("Bob Smith <bob@example.com>", "Hi", "x").unwrap();
        assert!(raw.contains("Bob Smith"));
        assert!(raw.contains("<bob@example.com>"));
    }

    #[test]
    fn test_recipient_list_keeps_quoted_commas() {
        let recipients =
            parse_recipients(r#""Doe, Jane" <jane@example.com>, bob@example.com"#).unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].name.as_deref(), Some("Doe, Jane"));
        assert_eq!(recipients[1].email, "bob@example.com");
        assert!(recipients[1].name.is_none());
    }

    #[test]
    fn test_malformed_recipients_are_rejected() {
        for to in ["", " , ", "Bob <not-an-address>", "bob@example.com, nope"] {
            assert!(parse_recipients(to).is_err(), "accepted {:?}", to);
        }
    }

    #[test]
    fn test_decode_padded_and_unpadded() {
        assert_eq!(decode_base64url("aGk").as_deref(), Some("hi"));
        assert_eq!(decode_base64url("aGk=").as_deref(), Some("hi"));
        assert!(decode_base64url("***").is_none());
    }

    #[test]
    fn test_extract_body_prefers_top_level_data() {
        let payload = text_part("text/html", "<p>top</p>");
        assert_eq!(extract_body(&payload), "<p>top</p>");
    }

    #[test]
    fn test_extract_body_finds_nested_plain_text() {
        let payload = MessagePart {
            mime_type: Some("multipart/mixed".to_string()),
            parts: vec![MessagePart {
                mime_type: Some("multipart/alternative".to_string()),
                parts: vec![
                    text_part("text/html", "<p>html</p>"),
                    text_part("text/plain", "plain"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(extract_body(&payload), "plain");
    }

    #[test]
    fn test_find_header_ignores_case() {
        let part = MessagePart {
            headers: vec![Header {
                name: "SUBJECT".to_string(),
                value: "Hi".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(find_header(&part, "Subject"), Some("Hi"));
        assert_eq!(find_header(&part, "From"), None);
    }
}
