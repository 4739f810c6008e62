//! XSRF token lifecycle.
//!
//! Emailnator protects its API with a Laravel-style XSRF token: the landing page sets an
//! `XSRF-TOKEN` cookie whose percent-decoded value must be echoed in the `X-XSRF-TOKEN` header of
//! every mutating request. [`TokenManager`] fetches that cookie, keeps the decoded value, and
//! re-fetches it when asked to or when the held value is stale.

use crate::parser::snippet;
use crate::{Error, HttpSession, Result};
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_TYPE, DNT, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

const XSRF_COOKIE: &str = "XSRF-TOKEN";
const X_XSRF_TOKEN: HeaderName = HeaderName::from_static("x-xsrf-token");
const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// A decoded XSRF token and whether it is still usable.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    stale: bool,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("stale", &self.stale)
            .finish()
    }
}

impl SessionToken {
    fn fresh(value: String) -> Self {
        Self {
            value,
            stale: false,
        }
    }

    /// Decoded token value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the token has been marked for re-fetching.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Owns the current XSRF token for one [`HttpSession`].
///
/// All fetches happen with the internal lock held, so concurrent callers never race a refresh;
/// share the manager behind an `Arc`.
pub struct TokenManager {
    session: HttpSession,
    state: Mutex<Option<SessionToken>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager that holds no token yet. No request is made until first use.
    pub fn new(session: HttpSession) -> Self {
        Self {
            session,
            state: Mutex::new(None),
        }
    }

    /// Return the held token, fetching one first if none is held or the held one is stale.
    ///
    /// # Errors
    /// Transport errors from the landing page request, or [`Error::Auth`] when the response
    /// does not carry a usable `XSRF-TOKEN` cookie.
    pub async fn ensure_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.as_ref().filter(|t| !t.stale) {
            return Ok(token.value.clone());
        }

        let value = self.fetch().await?;
        *state = Some(SessionToken::fresh(value.clone()));
        Ok(value)
    }

    /// Headers required on mutating requests, built around a valid token.
    pub async fn get_headers(&self) -> Result<HeaderMap> {
        let token = self.ensure_token().await?;
        self.headers_for(&token)
    }

    /// Re-fetch the token regardless of the current one.
    pub async fn refresh(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        let value = self.fetch().await?;
        *state = Some(SessionToken::fresh(value.clone()));
        Ok(value)
    }

    /// Re-fetch after the vendor rejected `rejected`.
    ///
    /// If another caller already replaced that token, the replacement is returned without a
    /// second fetch.
    pub(crate) async fn refresh_rejected(&self, rejected: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.as_ref() {
            if !token.stale && token.value != rejected {
                debug!("XSRF token already refreshed by another caller");
                return Ok(token.value.clone());
            }
        }

        let value = self.fetch().await?;
        *state = Some(SessionToken::fresh(value.clone()));
        Ok(value)
    }

    /// Flag the held token so the next [`ensure_token`](Self::ensure_token) fetches a new one.
    pub async fn mark_stale(&self) {
        if let Some(token) = self.state.lock().await.as_mut() {
            token.stale = true;
        }
    }

    /// Drop the held token.
    pub async fn clear(&self) {
        self.state.lock().await.take();
    }

    /// Snapshot of the held token, if any.
    pub async fn current(&self) -> Option<SessionToken> {
        self.state.lock().await.clone()
    }

    /// The session this manager fetches tokens through.
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    /// Build the mutating-request headers for a specific token value.
    pub fn headers_for(&self, token: &str) -> Result<HeaderMap> {
        let token_header = HeaderValue::from_str(token)
            .map_err(|_| Error::Auth("XSRF token is not a valid header value".into()))?;
        let referer = HeaderValue::from_str(&format!("{}/", self.session.base_url()))
            .map_err(|e| Error::Config(format!("invalid base_url for Referer: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(X_XSRF_TOKEN, token_header);
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(REFERER, referer);
        headers.insert(USER_AGENT, self.session.user_agent().clone());
        Ok(headers)
    }

    async fn fetch(&self) -> Result<String> {
        let url = self.session.base_url();
        debug!(url, "fetching XSRF token");

        let response = self.session.http().get(url).send().await?;
        let status = response.status();
        let raw = response
            .cookies()
            .find(|cookie| cookie.name() == XSRF_COOKIE)
            .map(|cookie| cookie.value().to_string());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                context: "landing page",
                status,
                body: snippet(&body),
            });
        }

        let raw = raw.ok_or_else(|| {
            Error::Auth(format!("{XSRF_COOKIE} cookie not set by {url}"))
        })?;
        let decoded = percent_decode_str(&raw)
            .decode_utf8()
            .map_err(|e| Error::Auth(format!("{XSRF_COOKIE} cookie is not valid UTF-8: {e}")))?
            .into_owned();

        if decoded.trim().is_empty() {
            return Err(Error::Auth(format!("{XSRF_COOKIE} cookie is empty")));
        }
        if HeaderValue::from_str(&decoded).is_err() {
            return Err(Error::Auth(format!(
                "{XSRF_COOKIE} cookie is not a valid header value"
            )));
        }

        debug!("XSRF token fetched");
        Ok(decoded)
    }
}
