//! Inbox listing and message retrieval.

use crate::parser::{
    parse_message_body, parse_message_response, validate_address, validate_message_id,
};
use crate::{Api, Error, Message, Result};
use serde::Serialize;
use tracing::debug;

const ENDPOINT: &str = "message-list";

#[derive(Serialize)]
struct ListRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct DetailRequest<'a> {
    email: &'a str,
    #[serde(rename = "messageID")]
    message_id: &'a str,
}

/// Reads inboxes through the `message-list` endpoint.
#[derive(Debug, Clone)]
pub struct MessageFetcher {
    api: Api,
}

impl MessageFetcher {
    /// Fetch messages through `api`.
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// List the messages received by `email`, in the order the vendor returns them
    /// (newest first in practice). An empty inbox yields an empty list.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for a malformed address (no request is made), transport errors
    /// for non-2xx answers, parsing errors when `messageData` is missing or not a list.
    pub async fn get_messages(&self, email: &str) -> Result<Vec<Message>> {
        validate_address(email)?;

        let body = self
            .api
            .post_json("message-list", ENDPOINT, &ListRequest { email })
            .await?;
        let messages = parse_message_response("message-list", &body)?;

        debug!(email, count = messages.len(), "listed messages");
        Ok(messages)
    }

    /// Fetch the full body (usually HTML) of one message.
    pub async fn get_message(&self, email: &str, message_id: &str) -> Result<String> {
        validate_address(email)?;
        validate_message_id(message_id)?;

        let body = self
            .api
            .post_json("message", ENDPOINT, &DetailRequest { email, message_id })
            .await?;
        parse_message_body("message", body)
    }

    /// Fetch the body of the first message in `email`'s inbox sent by `sender`.
    ///
    /// Returns `Ok(None)` when the inbox is empty or nothing matches.
    pub async fn get_message_from_sender(
        &self,
        sender: &str,
        email: &str,
    ) -> Result<Option<String>> {
        validate_sender(sender)?;

        let messages = self.get_messages(email).await?;
        if messages.is_empty() {
            return Ok(None);
        }

        match find_message_from_sender(&messages, sender)? {
            Some(message_id) => self.get_message(email, &message_id).await.map(Some),
            None => Ok(None),
        }
    }
}

fn validate_sender(sender: &str) -> Result<()> {
    if sender.trim().is_empty() {
        return Err(Error::InvalidInput("sender must be a non-empty string".into()));
    }
    Ok(())
}

/// Id of the first message whose sender matches `sender` (trimmed, case-insensitive).
///
/// Messages without an id are skipped.
///
/// # Errors
/// [`Error::InvalidInput`] when `messages` is empty or `sender` is blank.
pub fn find_message_from_sender(messages: &[Message], sender: &str) -> Result<Option<String>> {
    validate_sender(sender)?;
    if messages.is_empty() {
        return Err(Error::InvalidInput("message list is empty".into()));
    }

    let wanted = sender.trim().to_lowercase();
    Ok(messages
        .iter()
        .filter(|message| !message.message_id.trim().is_empty())
        .find(|message| message.from.trim().to_lowercase() == wanted)
        .map(|message| message.message_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RAW_TOKEN, config_for, mock_landing};
    use crate::{ErrorKind, HttpSession, TokenManager};
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;
    use std::sync::Arc;

    const EMAIL: &str = "j.o.h.n@gmail.com";

    fn fetcher(server: &MockServer) -> MessageFetcher {
        let tokens = TokenManager::new(HttpSession::new(&config_for(server)).unwrap());
        MessageFetcher::new(Api::new(Arc::new(tokens)))
    }

    fn message(id: &str, from: &str) -> Message {
        Message {
            message_id: id.into(),
            from: from.into(),
            subject: format!("from {from}"),
            time: "Just Now".into(),
        }
    }

    #[tokio::test]
    async fn lists_messages_in_vendor_order() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        let list = server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL }));
            then.status(200).json_body(json!({ "messageData": [
                { "messageID": "MTIz", "from": "Alice", "subject": "Newest", "time": "Just Now" },
                { "messageID": "NDU2", "from": "Bob", "subject": "Older", "time": "5 min ago" }
            ]}));
        });

        let messages = fetcher(&server).get_messages(EMAIL).await.unwrap();

        let subjects: Vec<_> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, ["Newest", "Older"]);
        list.assert();
    }

    #[tokio::test]
    async fn empty_inbox_is_empty_list() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        server.mock(|when, then| {
            when.method(POST).path("/message-list");
            then.status(200).json_body(json!({ "messageData": [] }));
        });

        let messages = fetcher(&server).get_messages(EMAIL).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn invalid_address_makes_no_request() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let fetcher = fetcher(&server);

        for email in ["", "invalid-email"] {
            let err = fetcher.get_messages(email).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
        let err = fetcher.get_message(EMAIL, " ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        landing.assert_hits(0);
    }

    #[tokio::test]
    async fn fetches_message_body() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        let detail = server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL, "messageID": "abc123" }));
            then.status(200).body("<html>Message body</html>");
        });

        let body = fetcher(&server).get_message(EMAIL, "abc123").await.unwrap();

        assert_eq!(body, "<html>Message body</html>");
        detail.assert();
    }

    #[tokio::test]
    async fn empty_message_body_is_a_parse_error() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        server.mock(|when, then| {
            when.method(POST).path("/message-list");
            then.status(200).body("");
        });

        let err = fetcher(&server).get_message(EMAIL, "abc123").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parsing);
    }

    #[tokio::test]
    async fn message_from_sender_fetches_first_match() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL }));
            then.status(200).json_body(json!({ "messageData": [
                { "messageID": "ADSVPN", "from": "AI TOOLS", "subject": "Ad", "time": "Just Now" },
                { "messageID": "123", "from": "Bob", "subject": "Code", "time": "Just Now" }
            ]}));
        });
        let detail = server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL, "messageID": "123" }));
            then.status(200).body("Your code is 123456");
        });

        let body = fetcher(&server)
            .get_message_from_sender("bob", EMAIL)
            .await
            .unwrap();

        assert_eq!(body.as_deref(), Some("Your code is 123456"));
        detail.assert();
    }

    #[tokio::test]
    async fn message_from_unknown_sender_is_none() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL }));
            then.status(200).json_body(json!({ "messageData": [
                { "messageID": "123", "from": "Alice", "subject": "Hello", "time": "Just Now" }
            ]}));
        });
        let detail = server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL, "messageID": "123" }));
            then.status(200).body("unused");
        });

        let body = fetcher(&server)
            .get_message_from_sender("Bob", EMAIL)
            .await
            .unwrap();

        assert!(body.is_none());
        detail.assert_hits(0);
    }

    #[test]
    fn find_from_sender_rules() {
        let messages = vec![message("", "Bob"), message("1", "Alice"), message("2", " bob ")];

        assert_eq!(
            find_message_from_sender(&messages, "BOB").unwrap(),
            Some("2".to_string())
        );
        assert_eq!(find_message_from_sender(&messages, "Carol").unwrap(), None);
        assert!(matches!(
            find_message_from_sender(&[], "Alice"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            find_message_from_sender(&messages, ""),
            Err(Error::InvalidInput(_))
        ));
    }
}
