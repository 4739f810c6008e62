//! # Emailnator Client
//! Async and blocking wrapper around the Emailnator temporary Gmail HTTP API, providing simple methods to generate disposable addresses and read their inboxes from Rust using [`Client`], [`ClientBuilder`] and [`BlockingClient`].
//!
//! ## Audience and uses
//! For Rust developers who need throwaway Gmail-style addresses in integration tests, demos, or automation scripts without running mail infrastructure: configure with [`Config`] or [`ClientBuilder`], connect, generate an address, then poll for messages ([`Message`]).
//!
//! ## Runtime requirements
//! [`Client`] is async; run it inside a Tokio (v1) runtime. [`BlockingClient`] runs its own runtime on a worker thread and must be called from plain threads only. HTTP calls use `reqwest` with a cookie store; the vendor's XSRF token is fetched on [`Client::connect`] and refreshed once when the vendor reports it expired.
//!
//! ## Logging
//! The crate emits `tracing` events and never installs a subscriber. Token values are never logged.
//!
//! ## Out of scope
//! Not a general-purpose mail client, SMTP sender, or durable mailbox. It only proxies the Emailnator service and inherits its availability, rate limits, and retention.
//!
//! ## Errors
//! Every failure is an [`Error`]; [`Error::kind`] sorts it into transport, authentication, parsing, usage, or configuration problems ([`ErrorKind`]). The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use emailnator_client::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), emailnator_client::Error> {
//!     let client = Client::new(Config::load(None)?);
//!     client.connect().await?;
//!
//!     let email = client.generate_email().await?;
//!     println!("Generated: {}", email);
//!
//!     let messages = client.get_messages(&email).await?;
//!     for msg in messages {
//!         println!("From: {}, Subject: {}", msg.from, msg.subject);
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod blocking;
mod client;
mod config;
mod error;
mod generator;
mod messages;
mod models;
mod parser;
mod session;
mod token;

pub use api::{Api, TOKEN_EXPIRED_STATUS};
pub use blocking::BlockingClient;
pub use client::{Client, ClientBuilder};
pub use config::{
    Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, GenerationMode,
};
pub use error::{Error, ErrorKind};
pub use generator::AddressGenerator;
pub use messages::{MessageFetcher, find_message_from_sender};
pub use models::{BulkSize, Inbox, Message};
pub use session::HttpSession;
pub use token::{SessionToken, TokenManager};

/// Result type alias for Emailnator operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
