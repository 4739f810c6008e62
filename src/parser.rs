//! Response parsing and input checks.

use crate::{Error, Message, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

const SNIPPET_LEN: usize = 400;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[a-zA-Z0-9]+$").expect("email pattern is valid")
});

/// First few hundred characters of a body, for error messages.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_LEN).collect()
}

pub(crate) fn is_email_address(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// Reject anything that is not shaped like `local@domain.tld`.
pub(crate) fn validate_address(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::InvalidInput("email must be a non-empty string".into()));
    }
    if !is_email_address(email) {
        return Err(Error::InvalidInput(format!("invalid email format: {email}")));
    }
    Ok(())
}

pub(crate) fn validate_message_id(message_id: &str) -> Result<()> {
    if message_id.trim().is_empty() {
        return Err(Error::InvalidInput("message id must be a non-empty string".into()));
    }
    Ok(())
}

fn parse_json(context: &'static str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|_| {
        Error::parse(
            context,
            format!("response is not valid JSON: {}", snippet(body)),
        )
    })
}

/// Extract addresses from a `{"email": ...}` payload.
///
/// The vendor answers single generation with either a string or a one-element list, and bulk
/// generation with a list. Every entry must look like an address.
pub(crate) fn parse_email_response(context: &'static str, body: &str) -> Result<Vec<String>> {
    let data = parse_json(context, body)?;

    let emails = match data.get("email") {
        Some(Value::String(email)) => vec![email.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    Error::parse(context, format!("non-string entry in `email`: {item}"))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(Error::parse(
                context,
                format!("missing or invalid `email` field: {}", snippet(body)),
            ));
        }
    };

    if emails.is_empty() {
        return Err(Error::parse(context, "`email` list is empty"));
    }
    if let Some(bad) = emails.iter().find(|email| !is_email_address(email)) {
        return Err(Error::parse(context, format!("invalid address `{bad}`")));
    }

    Ok(emails)
}

/// Extract the ordered message list from a `{"messageData": [...]}` payload.
///
/// Entries that are not objects or carry no `messageID` are skipped; missing `from`, `subject`
/// or `time` fields are left empty.
pub(crate) fn parse_message_response(context: &'static str, body: &str) -> Result<Vec<Message>> {
    let data = parse_json(context, body)?;

    let list = data
        .get("messageData")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::parse(
                context,
                format!("missing or non-array `messageData`: {}", snippet(body)),
            )
        })?;

    let messages: Vec<Message> = list
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();
    if messages.len() < list.len() {
        debug!(
            context,
            skipped = list.len() - messages.len(),
            "skipped unusable message entries"
        );
    }
    Ok(messages)
}

/// A message body is returned verbatim (usually HTML) but must not be blank.
pub(crate) fn parse_message_body(context: &'static str, body: String) -> Result<String> {
    if body.trim().is_empty() {
        return Err(Error::parse(context, "message body is empty"));
    }
    Ok(body)
}
