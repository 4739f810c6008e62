//! Token-carrying request execution.
//!
//! Every Emailnator API call is a JSON `POST` that must carry the current XSRF token. When the
//! vendor answers `419 Page Expired` the token is refreshed and the call is retried exactly
//! once; a second rejection surfaces as [`Error::Auth`].

use crate::parser::snippet;
use crate::{Error, HttpSession, Result, TokenManager};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Status the vendor returns when the XSRF token is no longer accepted.
pub const TOKEN_EXPIRED_STATUS: u16 = 419;

fn is_token_expired(status: StatusCode) -> bool {
    status.as_u16() == TOKEN_EXPIRED_STATUS
}

/// Shared request executor used by [`AddressGenerator`](crate::AddressGenerator) and
/// [`MessageFetcher`](crate::MessageFetcher).
///
/// Cloning is cheap: the session and token manager are shared.
#[derive(Debug, Clone)]
pub struct Api {
    session: HttpSession,
    tokens: Arc<TokenManager>,
}

impl Api {
    /// Execute requests through the session owned by `tokens`.
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            session: tokens.session().clone(),
            tokens,
        }
    }

    /// The token manager backing this executor.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The HTTP session requests go through.
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    /// POST `body` as JSON to `endpoint` and return the response text.
    ///
    /// `context` names the call in errors and logs.
    ///
    /// # Errors
    /// - [`Error::Request`] on connection failures and timeouts,
    /// - [`Error::Status`] on any non-2xx other than the expiry signal,
    /// - [`Error::Auth`] if the token cannot be obtained or is rejected after one refresh.
    pub async fn post_json<B>(
        &self,
        context: &'static str,
        endpoint: &str,
        body: &B,
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let url = self.session.endpoint(endpoint);
        let token = self.tokens.ensure_token().await?;

        let (mut status, mut text) = self.send(context, &url, &token, body).await?;

        if is_token_expired(status) {
            warn!(context, "XSRF token rejected, refreshing and retrying once");
            let fresh = self.tokens.refresh_rejected(&token).await?;
            (status, text) = self.send(context, &url, &fresh, body).await?;

            if is_token_expired(status) {
                self.tokens.mark_stale().await;
                return Err(Error::Auth(format!(
                    "{context} rejected the XSRF token again after a refresh"
                )));
            }
        }

        if !status.is_success() {
            return Err(Error::Status {
                context,
                status,
                body: snippet(&text),
            });
        }

        Ok(text)
    }

    async fn send<B>(
        &self,
        context: &'static str,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<(StatusCode, String)>
    where
        B: Serialize + ?Sized,
    {
        let headers = self.tokens.headers_for(token)?;
        debug!(context, url, "sending request");

        let response = self
            .session
            .http()
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(context, status = status.as_u16(), bytes = text.len(), "received response");

        Ok((status, text))
    }
}
