//! Error types for the Emailnator client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur during Emailnator operations.
///
/// Use [`Error::kind`] to branch on the broad category instead of matching every variant.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connection failure, timeout, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The vendor answered with a non-success status.
    #[error("{context} returned HTTP {status}: {body}")]
    Status {
        /// Short name of the call that failed.
        context: &'static str,
        /// Status code returned by the vendor.
        status: StatusCode,
        /// Truncated response body.
        body: String,
    },

    /// The XSRF token could not be obtained, or was rejected after a refresh.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response did not have the expected shape.
    #[error("unexpected {context} response: {msg}")]
    ResponseParse {
        /// Short name of the call whose response was rejected.
        context: &'static str,
        /// What was wrong with it.
        msg: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A method was called before [`Client::connect`](crate::Client::connect) succeeded.
    #[error("client is not connected; call `connect` first")]
    NotConnected,

    /// An argument was rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A blocking call was made from a thread that is driving an async runtime.
    #[error("blocking call made from within an async runtime; use `Client` instead")]
    NestedRuntime,

    /// The blocking client's worker thread is no longer running.
    #[error("blocking client worker has shut down")]
    WorkerClosed,

    /// The blocking client's worker could not be started.
    #[error("failed to start blocking worker: {0}")]
    Runtime(#[source] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML or has mistyped values.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The vendor could not be reached or answered with a non-2xx status.
    Transport,
    /// The session token is missing or was rejected.
    Authentication,
    /// The vendor answered, but not in the expected format.
    Parsing,
    /// The API was used incorrectly (not connected, bad arguments, wrong thread).
    Usage,
    /// The configuration could not be loaded or applied.
    Configuration,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request(_) | Error::Status { .. } => ErrorKind::Transport,
            Error::Auth(_) => ErrorKind::Authentication,
            Error::ResponseParse { .. } | Error::Json(_) => ErrorKind::Parsing,
            Error::NotConnected
            | Error::InvalidInput(_)
            | Error::NestedRuntime
            | Error::WorkerClosed
            | Error::Runtime(_) => ErrorKind::Usage,
            Error::Config(_) | Error::Toml(_) | Error::Io(_) => ErrorKind::Configuration,
        }
    }

    pub(crate) fn parse(context: &'static str, msg: impl Into<String>) -> Self {
        Error::ResponseParse {
            context,
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_unreachable_from_changed_format() {
        let status = Error::Status {
            context: "generate-email",
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(status.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::parse("generate-email", "missing `email`").kind(),
            ErrorKind::Parsing
        );
        assert_eq!(Error::Auth("gone".into()).kind(), ErrorKind::Authentication);
        assert_eq!(Error::NotConnected.kind(), ErrorKind::Usage);
        assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Configuration);
    }

    #[test]
    fn status_message_names_the_call() {
        let err = Error::Status {
            context: "message-list",
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "message-list returned HTTP 500 Internal Server Error: boom"
        );
    }
}
