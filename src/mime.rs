//! Building [`EmailData`] from raw RFC 5322 messages
//!
//! Sources that fetch raw messages (IMAP, mbox files, fixtures) can use this
//! to get the subject, sender, received time and both bodies out of a MIME
//! tree.

use crate::error::{Error, Result};
use crate::types::EmailData;
use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::debug;

/// Parse raw message bytes into an [`EmailData`] with the given source id
pub fn parse_email_data(id: impl Into<String>, raw: &[u8]) -> Result<EmailData> {
    let id = id.into();
    let parsed = mailparse::parse_mail(raw)?;

    let sender = parsed
        .headers
        .get_first_value("From")
        .ok_or_else(|| Error::MissingHeader("From".into()))?;
    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
    let received = extract_date(&parsed)?;

    let (body_text, body_html) = extract_body_parts(&parsed);
    if body_text.trim().is_empty() && body_html.trim().is_empty() {
        return Err(Error::EmptyBody(id));
    }

    debug!("Decoded message {}: {} from {}", id, subject, sender);

    Ok(EmailData {
        id,
        subject,
        sender,
        received,
        body_text,
        body_html,
        platform_hint: None,
    })
}

fn extract_date(parsed: &ParsedMail<'_>) -> Result<DateTime<Utc>> {
    let value = parsed
        .headers
        .get_first_value("Date")
        .ok_or_else(|| Error::MissingHeader("Date".into()))?;

    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidHeader {
            header: "Date".into(),
            details: format!("{value}: {e}"),
        })
}

/// First text/plain and first text/html leaf, depth first
///
/// A message without subparts is its own leaf; there, anything but HTML is text.
fn extract_body_parts(parsed: &ParsedMail<'_>) -> (String, String) {
    let mut text = String::new();
    let mut html = String::new();
    let mut stack = vec![parsed];

    while let Some(part) = stack.pop() {
        if !part.subparts.is_empty() {
            // reversed so the first subpart is popped first
            stack.extend(part.subparts.iter().rev());
            continue;
        }

        let content_type = part.ctype.mimetype.to_lowercase();
        let is_html = content_type.contains("text/html");
        let slot = if is_html {
            &mut html
        } else if content_type.contains("text/plain") || std::ptr::eq(part, parsed) {
            &mut text
        } else {
            continue;
        };

        if slot.is_empty()
            && let Ok(body) = part.get_body()
        {
            *slot = body;
        }
        if !text.is_empty() && !html.is_empty() {
            break;
        }
    }

    (text, html)
}
