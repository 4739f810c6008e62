//! Async walkthrough of the Emailnator client.
//!
//! Features demonstrated:
//! - Loading configuration (`emailnator.toml` if present, plus `EMAILNATOR_*` overrides)
//! - Connecting and fetching the session token
//! - Generating a temporary address
//! - Polling the inbox
//! - Fetching a message body by sender
//!
//! Run with `RUST_LOG=emailnator_client=debug` to see request logs.

use emailnator_client::{Client, Config};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SENDER: &str = "AI TOOLS";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emailnator_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("📧 Emailnator Rust Client - Async Demo");
    println!("{}", "=".repeat(50));

    let config = Config::load(Some(Path::new("emailnator.toml")))?;
    let client = Client::new(config);
    client.connect().await?;
    println!("   ✅ Connected to Emailnator");

    let email = client.generate_email().await?;
    println!("\n📬 Generated: {email}");
    println!("   Send an email to it (polling for up to 2 minutes)");

    let start = Instant::now();
    let timeout = Duration::from_secs(120);
    let poll_interval = Duration::from_secs(5);

    loop {
        let messages = client.get_messages(&email).await?;
        println!("   {} message(s)", messages.len());
        for msg in &messages {
            println!("   - {msg}");
        }

        if let Some(body) = client.get_message_from_sender(SENDER, &email).await? {
            println!("\n📄 Message from {SENDER}:\n{body}");
            break;
        }
        if start.elapsed() >= timeout {
            println!("\n⏰ Nothing from {SENDER} yet");
            break;
        }
        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
