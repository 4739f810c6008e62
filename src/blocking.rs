//! Synchronous wrapper around [`Client`].
//!
//! A [`BlockingClient`] owns one worker thread that drives a current-thread Tokio runtime and the
//! async client. Each call is shipped to the worker as a job and the caller blocks until the
//! result comes back. Calling from inside a Tokio runtime is rejected with
//! [`Error::NestedRuntime`]; use [`Client`] there.

use crate::{BulkSize, Client, Config, Error, HttpSession, Inbox, Message, Result};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::runtime::{Builder, Handle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce(Arc<Client>) -> Pin<Box<dyn Future<Output = ()>>> + Send>;

/// Blocking client for the Emailnator temporary Gmail service.
///
/// Mirrors [`Client`]: create it, call [`connect`](Self::connect), then use the same operations
/// without `.await`. Errors are the async client's errors, returned as-is.
///
/// Calls are rejected with [`Error::NestedRuntime`] on any thread that has a Tokio runtime
/// context, which includes `tokio::task::spawn_blocking` threads: Tokio does not tell those apart
/// from worker threads. From async code use [`Client`], or call from a plain
/// `std::thread::spawn` thread.
///
/// # Examples
/// ```no_run
/// use emailnator_client::{BlockingClient, Config};
///
/// fn main() -> Result<(), emailnator_client::Error> {
///     let client = BlockingClient::new(Config::default())?;
///     client.connect()?;
///     let email = client.generate_email()?;
///     println!("{email}");
///     Ok(())
/// }
/// ```
pub struct BlockingClient {
    jobs: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("running", &self.jobs.is_some())
            .finish_non_exhaustive()
    }
}

impl BlockingClient {
    /// Start a worker for an unconnected client built from `config`.
    ///
    /// # Errors
    /// [`Error::Runtime`] if the runtime or the worker thread cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        Self::spawn(Client::new(config))
    }

    /// Like [`new`](Self::new), sending requests through `session`.
    pub fn with_session(config: Config, session: HttpSession) -> Result<Self> {
        Self::spawn(Client::with_session(config, session))
    }

    fn spawn(client: Client) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        let worker = thread::Builder::new()
            .name("emailnator-blocking".into())
            .spawn(move || {
                runtime.block_on(async move {
                    let client = Arc::new(client);
                    while let Some(job) = queue.recv().await {
                        job(Arc::clone(&client)).await;
                    }
                    if let Ok(mut client) = Arc::try_unwrap(client) {
                        client.close().await;
                    }
                });
                debug!("blocking worker stopped");
            })
            .map_err(Error::Runtime)?;

        Ok(Self {
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    fn run<T, F, Fut>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Client>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        if Handle::try_current().is_ok() {
            return Err(Error::NestedRuntime);
        }
        let jobs = self.jobs.as_ref().ok_or(Error::WorkerClosed)?;

        let (reply, result) = oneshot::channel();
        let job: Job = Box::new(move |client| {
            Box::pin(async move {
                // The caller may have gone away; nothing to report to.
                let _ = reply.send(call(client).await);
            })
        });
        jobs.send(job).map_err(|_| Error::WorkerClosed)?;

        result.blocking_recv().map_err(|_| Error::WorkerClosed)?
    }

    /// Build the HTTP session and fetch the first XSRF token. See [`Client::connect`].
    pub fn connect(&self) -> Result<()> {
        self.run(|client| async move { client.connect().await })
    }

    /// Whether the worker's client is connected.
    ///
    /// # Errors
    /// [`Error::NestedRuntime`] inside a runtime, [`Error::WorkerClosed`] after
    /// [`close`](Self::close).
    pub fn is_connected(&self) -> Result<bool> {
        self.run(|client| async move { Ok(client.is_connected()) })
    }

    /// Force a new XSRF token to be fetched.
    pub fn refresh_token(&self) -> Result<()> {
        self.run(|client| async move { client.refresh_token().await })
    }

    /// Generate a temporary address.
    pub fn generate_email(&self) -> Result<String> {
        self.run(|client| async move { client.generate_email().await })
    }

    /// Generate `size` distinct addresses in one request.
    pub fn generate_bulk_emails(&self, size: BulkSize) -> Result<Vec<String>> {
        self.run(move |client| async move { client.generate_bulk_emails(size).await })
    }

    /// List the messages received by `email`.
    pub fn get_messages(&self, email: &str) -> Result<Vec<Message>> {
        let email = email.to_owned();
        self.run(move |client| async move { client.get_messages(&email).await })
    }

    /// Fetch the body of one message.
    pub fn get_message(&self, email: &str, message_id: &str) -> Result<String> {
        let email = email.to_owned();
        let message_id = message_id.to_owned();
        self.run(move |client| async move { client.get_message(&email, &message_id).await })
    }

    /// Fetch the body of the first message from `sender`, or `None`.
    pub fn get_message_from_sender(&self, sender: &str, email: &str) -> Result<Option<String>> {
        let sender = sender.to_owned();
        let email = email.to_owned();
        self.run(move |client| async move {
            client.get_message_from_sender(&sender, &email).await
        })
    }

    /// Generate an address and list its messages in one call.
    pub fn generate_email_with_messages(&self) -> Result<Inbox> {
        self.run(|client| async move { client.generate_email_with_messages().await })
    }

    /// Stop the worker and wait for it to exit. Later calls fail with [`Error::WorkerClosed`].
    pub fn close(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("blocking worker panicked");
            }
        }
    }
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        self.close();
    }
}
