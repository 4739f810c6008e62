//! The same flow as `async_demo`, without an async runtime.

use emailnator_client::{BlockingClient, BulkSize, Config};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emailnator_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(Some(Path::new("emailnator.toml")))?;
    let client = BlockingClient::new(config)?;
    client.connect()?;

    let inbox = client.generate_email_with_messages()?;
    println!("{inbox}");

    match client.get_message_from_sender("AI TOOLS", &inbox.email)? {
        Some(body) => println!("\nMessage from AI TOOLS:\n{body}"),
        None => println!("\nNo message from AI TOOLS yet"),
    }

    let batch = client.generate_bulk_emails(BulkSize::Hundred)?;
    println!("\nGenerated {} addresses, first: {}", batch.len(), batch[0]);

    Ok(())
}
