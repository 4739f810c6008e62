//! Emailnator async client implementation.

use crate::{
    AddressGenerator, Api, BulkSize, Config, Error, GenerationMode, HttpSession, Inbox, Message,
    MessageFetcher, Result, TokenManager,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

struct Connection {
    api: Api,
    generator: AddressGenerator,
    fetcher: MessageFetcher,
}

/// Async client for the Emailnator temporary Gmail service.
///
/// Construction does no I/O. Call [`Client::connect`] once before anything else: it builds the
/// HTTP session and fetches the first XSRF token. Every other operation fails with
/// [`Error::NotConnected`] until then.
///
/// Use [`Client::builder`] to override individual settings.
pub struct Client {
    config: Config,
    session: Option<HttpSession>,
    conn: OnceCell<Connection>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create an unconnected client from `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
            conn: OnceCell::new(),
        }
    }

    /// Create an unconnected client that will send its requests through `session` instead of
    /// building one from `config`.
    ///
    /// The session stays owned by the client (and any clones the caller keeps) across
    /// [`close`](Self::close); only the token is dropped. `config` is still validated on
    /// [`connect`](Self::connect).
    pub fn with_session(config: Config, session: HttpSession) -> Self {
        Self {
            config,
            session: Some(session),
            conn: OnceCell::new(),
        }
    }

    /// Build the HTTP session and fetch the first XSRF token.
    ///
    /// Concurrent calls are serialized and only the first one does any work; later calls return
    /// immediately. If connecting fails the client stays unconnected and may be retried.
    ///
    /// # Examples
    /// ```no_run
    /// # use emailnator_client::{Client, Config};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), emailnator_client::Error> {
    /// let client = Client::new(Config::default());
    /// client.connect().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(&self) -> Result<()> {
        self.conn
            .get_or_try_init(|| async {
                self.config.validate()?;
                let session = match &self.session {
                    Some(session) => session.clone(),
                    None => HttpSession::new(&self.config)?,
                };
                let tokens = Arc::new(TokenManager::new(session));
                tokens.ensure_token().await?;

                let api = Api::new(tokens);
                info!(base_url = api.session().base_url(), "connected to Emailnator");

                Ok::<_, Error>(Connection {
                    generator: AddressGenerator::new(
                        api.clone(),
                        self.config.generation_modes().to_vec(),
                    ),
                    fetcher: MessageFetcher::new(api.clone()),
                    api,
                })
            })
            .await?;
        Ok(())
    }

    /// Whether [`connect`](Self::connect) has completed.
    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    fn ready(&self) -> Result<&Connection> {
        self.conn.get().ok_or(Error::NotConnected)
    }

    /// Configuration this client was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token manager of the live connection, if connected.
    pub fn tokens(&self) -> Option<&Arc<TokenManager>> {
        self.conn.get().map(|conn| conn.api.tokens())
    }

    /// Force a new XSRF token to be fetched.
    pub async fn refresh_token(&self) -> Result<()> {
        self.ready()?.api.tokens().refresh().await?;
        Ok(())
    }

    /// Generate a temporary address.
    ///
    /// # Examples
    /// ```no_run
    /// # use emailnator_client::{Client, Config};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), emailnator_client::Error> {
    /// let client = Client::new(Config::default());
    /// client.connect().await?;
    /// let email = client.generate_email().await?;
    /// println!("{email}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate_email(&self) -> Result<String> {
        self.ready()?.generator.generate_email().await
    }

    /// Generate `size` distinct addresses in one request.
    pub async fn generate_bulk_emails(&self, size: BulkSize) -> Result<Vec<String>> {
        self.ready()?.generator.generate_bulk_emails(size).await
    }

    /// List the messages received by `email`, newest first.
    ///
    /// # Examples
    /// ```no_run
    /// # use emailnator_client::{Client, Config};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), emailnator_client::Error> {
    /// let client = Client::new(Config::default());
    /// client.connect().await?;
    /// let email = client.generate_email().await?;
    /// for msg in client.get_messages(&email).await? {
    ///     println!("{}: {}", msg.from, msg.subject);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_messages(&self, email: &str) -> Result<Vec<Message>> {
        self.ready()?.fetcher.get_messages(email).await
    }

    /// Fetch the body of one message.
    pub async fn get_message(&self, email: &str, message_id: &str) -> Result<String> {
        self.ready()?.fetcher.get_message(email, message_id).await
    }

    /// Fetch the body of the first message from `sender`, or `None` if there is none.
    pub async fn get_message_from_sender(
        &self,
        sender: &str,
        email: &str,
    ) -> Result<Option<String>> {
        self.ready()?
            .fetcher
            .get_message_from_sender(sender, email)
            .await
    }

    /// Generate an address and list its messages in one call.
    pub async fn generate_email_with_messages(&self) -> Result<Inbox> {
        let conn = self.ready()?;
        let email = conn.generator.generate_email().await?;
        let messages = conn.fetcher.get_messages(&email).await?;

        let inbox = Inbox { email, messages };
        info!(
            email = %inbox.email,
            messages = inbox.messages.len(),
            "generated address with inbox\n{inbox}"
        );
        Ok(inbox)
    }

    /// Drop the token and the live connection. The client can be connected again afterwards.
    ///
    /// A session built by [`connect`](Self::connect) is dropped with the connection; an injected
    /// one (see [`with_session`](Self::with_session)) is kept and reused on the next connect.
    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.api.tokens().clear().await;
            info!("Emailnator client closed");
        }
    }
}

/// Builder for configuring an Emailnator client.
///
/// Start with [`Client::builder`]; every setting defaults to [`Config::default`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: Config,
    session: Option<HttpSession>,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override the vendor base URL.
    ///
    /// Useful for testing against a local mock server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.with_base_url(base_url);
        self
    }

    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Allow HTTP/2 (default: true).
    pub fn use_http2(mut self, enabled: bool) -> Self {
        self.config = self.config.with_http2(enabled);
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.with_user_agent(user_agent);
        self
    }

    /// Set a proxy URL (e.g. "socks5://127.0.0.1:9050"). "None" and empty values clear it.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config = self.config.with_proxy(proxy);
        self
    }

    /// Connect directly, without a proxy.
    pub fn no_proxy(mut self) -> Self {
        self.config = self.config.without_proxy();
        self
    }

    /// Address flavours requested on generation.
    pub fn generation_modes(mut self, modes: impl IntoIterator<Item = GenerationMode>) -> Self {
        self.config = self.config.with_generation_modes(modes);
        self
    }

    /// Send requests through an existing session.
    pub fn session(mut self, session: HttpSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Build an unconnected client. No I/O happens here.
    pub fn build(self) -> Client {
        match self.session {
            Some(session) => Client::with_session(self.config, session),
            None => Client::new(self.config),
        }
    }

    /// Build the client and connect it.
    ///
    /// # Examples
    /// ```no_run
    /// # use emailnator_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), emailnator_client::Error> {
    /// let client = Client::builder()
    ///     .user_agent("my-app/1.0")
    ///     .connect()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(self) -> Result<Client> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testing::{RAW_TOKEN, TOKEN, config_for, mock_landing};
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    const EMAIL: &str = "j.o.h.n@gmail.com";

    #[tokio::test]
    async fn connect_fetches_token_exactly_once() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let client = Client::new(config_for(&server));

        assert!(!client.is_connected());
        let (first, second) = tokio::join!(client.connect(), client.connect());
        first.unwrap();
        second.unwrap();
        client.connect().await.unwrap();

        assert!(client.is_connected());
        landing.assert_hits(1);
        let token = client.tokens().unwrap().current().await.unwrap();
        assert_eq!(token.value(), TOKEN);
    }

    #[tokio::test]
    async fn operations_before_connect_are_rejected() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let client = Client::new(config_for(&server));

        let errors = [
            client.generate_email().await.unwrap_err(),
            client
                .generate_bulk_emails(BulkSize::Hundred)
                .await
                .unwrap_err(),
            client.get_messages(EMAIL).await.unwrap_err(),
            client.get_message(EMAIL, "1").await.unwrap_err(),
            client.get_message_from_sender("Bob", EMAIL).await.unwrap_err(),
            client.generate_email_with_messages().await.unwrap_err(),
            client.refresh_token().await.unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(err, Error::NotConnected), "{err:?}");
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
        landing.assert_hits(0);
    }

    #[tokio::test]
    async fn failed_connect_leaves_client_unconnected() {
        let server = MockServer::start();
        let mut broken = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("<html>no cookie</html>");
        });
        let client = Client::new(config_for(&server));

        let err = client.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!client.is_connected());
        assert!(matches!(
            client.generate_email().await,
            Err(Error::NotConnected)
        ));

        broken.delete();
        mock_landing(&server, RAW_TOKEN);
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn invalid_config_fails_on_connect() {
        let client = Client::new(Config::default().with_base_url("ftp://example.com"));

        let err = client.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn generate_email_with_messages_chains_calls() {
        let server = MockServer::start();
        mock_landing(&server, RAW_TOKEN);
        server.mock(|when, then| {
            when.method(POST).path("/generate-email");
            then.status(200).json_body(json!({ "email": [EMAIL] }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/message-list")
                .json_body(json!({ "email": EMAIL }));
            then.status(200).json_body(json!({ "messageData": [
                { "messageID": "1", "from": "Alice", "subject": "Welcome", "time": "Just Now" }
            ]}));
        });
        let client = Client::new(config_for(&server));
        client.connect().await.unwrap();

        let inbox = client.generate_email_with_messages().await.unwrap();

        assert_eq!(inbox.email, EMAIL);
        assert_eq!(inbox.messages.len(), 1);
        assert_eq!(inbox.messages[0].subject, "Welcome");
    }

    #[tokio::test]
    async fn close_returns_to_unconnected() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let mut client = Client::new(config_for(&server));
        client.connect().await.unwrap();

        client.close().await;

        assert!(!client.is_connected());
        assert!(client.tokens().is_none());
        assert!(matches!(
            client.get_messages(EMAIL).await,
            Err(Error::NotConnected)
        ));

        client.connect().await.unwrap();
        landing.assert_hits(2);
    }

    #[tokio::test]
    async fn refresh_token_refetches() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let client = Client::new(config_for(&server));
        client.connect().await.unwrap();

        client.refresh_token().await.unwrap();

        landing.assert_hits(2);
    }

    #[tokio::test]
    async fn injected_session_is_used() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let session = HttpSession::new(&config_for(&server)).unwrap();
        let client = Client::with_session(Config::default(), session);

        client.connect().await.unwrap();

        landing.assert_hits(1);
        assert_eq!(
            client.tokens().unwrap().session().base_url(),
            server.base_url()
        );
    }

    #[tokio::test]
    async fn injected_session_still_validates_config() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let session = HttpSession::new(&config_for(&server)).unwrap();
        let config = Config::default().with_generation_modes(Vec::new());
        let client = Client::with_session(config, session);

        let err = client.connect().await.unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(!client.is_connected());
        landing.assert_hits(0);
    }

    #[tokio::test]
    async fn injected_session_survives_close() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let session = HttpSession::new(&config_for(&server)).unwrap();
        let mut client = Client::with_session(Config::default(), session);
        client.connect().await.unwrap();

        client.close().await;
        assert!(!client.is_connected());
        client.connect().await.unwrap();

        landing.assert_hits(2);
        assert_eq!(
            client.tokens().unwrap().session().base_url(),
            server.base_url()
        );
    }

    #[tokio::test]
    async fn builder_connects() {
        let server = MockServer::start();
        let landing = mock_landing(&server, RAW_TOKEN);
        let endpoint = server.mock(|when, then| {
            when.method(POST)
                .path("/generate-email")
                .json_body(json!({ "email": ["googleMail"] }));
            then.status(200).json_body(json!({ "email": "abc@googlemail.com" }));
        });

        let client = Client::builder()
            .base_url(server.base_url())
            .use_http2(false)
            .proxy("None")
            .generation_modes([GenerationMode::GoogleMail])
            .connect()
            .await
            .unwrap();

        assert_eq!(client.config().proxy(), None);
        assert_eq!(client.generate_email().await.unwrap(), "abc@googlemail.com");
        landing.assert_hits(1);
        endpoint.assert();
    }
}
