//! Explicitly owned HTTP client holder.
//!
//! One [`HttpSession`] wraps one `reqwest::Client` (connection pool plus cookie jar) built from a
//! [`Config`]. Create it once, clone it into whatever needs to talk to the vendor, and drop the
//! last clone on shutdown. Clones share the pool and the cookies.

use crate::{Config, Error, Result};
use reqwest::header::HeaderValue;
use std::fmt;
use tracing::debug;

/// Reusable HTTP client configured for the Emailnator service.
#[derive(Clone)]
pub struct HttpSession {
    http: reqwest::Client,
    base_url: String,
    user_agent: HeaderValue,
    proxy: Option<String>,
}

impl fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("http", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl HttpSession {
    /// Build the underlying HTTP client.
    ///
    /// The cookie store is always enabled since the XSRF token arrives as a cookie and the
    /// vendor's session cookie must be echoed back. Proxy settings from the environment are
    /// ignored; only [`Config::proxy`] is used.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid or the client cannot be built
    /// (for example an unsupported proxy scheme).
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let user_agent = HeaderValue::from_str(config.user_agent())
            .map_err(|e| Error::Config(format!("invalid user_agent: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .user_agent(user_agent.clone());

        builder = match config.proxy() {
            Some(proxy_url) => builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::Config(format!("invalid proxy `{proxy_url}`: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        if !config.use_http2() {
            builder = builder.http1_only();
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        debug!(
            base_url = config.base_url(),
            proxied = config.proxy().is_some(),
            http2 = config.use_http2(),
            "HTTP session created"
        );

        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            user_agent,
            proxy: config.proxy().map(str::to_string),
        })
    }

    /// The underlying `reqwest` client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Vendor base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a vendor endpoint such as `generate-email`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// User agent header value sent with every request.
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }

    /// Proxy URL in use, or `None` for a direct connection.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = Config::default().with_base_url("http://127.0.0.1:8080/");
        let session = HttpSession::new(&config).unwrap();

        assert_eq!(session.base_url(), "http://127.0.0.1:8080");
        assert_eq!(
            session.endpoint("/generate-email"),
            "http://127.0.0.1:8080/generate-email"
        );
        assert_eq!(
            session.endpoint("message-list"),
            "http://127.0.0.1:8080/message-list"
        );
    }

    #[test]
    fn absent_proxy_never_becomes_text() {
        let config = Config::from_toml_str("proxy = \"None\"").unwrap();
        let session = HttpSession::new(&config).unwrap();

        assert_eq!(session.proxy(), None);
        assert!(!format!("{session:?}").contains("\"None\""));
    }

    #[test]
    fn keeps_configured_proxy() {
        let config = Config::default().with_proxy("http://127.0.0.1:3128");
        let session = HttpSession::new(&config).unwrap();
        assert_eq!(session.proxy(), Some("http://127.0.0.1:3128"));
    }

    #[test]
    fn http1_only_session_builds() {
        let config = Config::default().with_http2(false);
        assert!(HttpSession::new(&config).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected_before_building() {
        let config = Config::default().with_generation_modes(Vec::new());
        assert!(matches!(HttpSession::new(&config), Err(Error::Config(_))));
    }
}
