//! Address generation.

use crate::parser::parse_email_response;
use crate::{Api, BulkSize, Error, GenerationMode, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

const CONTEXT: &str = "generate-email";
const ENDPOINT: &str = "generate-email";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    email: &'a [GenerationMode],
    #[serde(rename = "emailNo", skip_serializing_if = "Option::is_none")]
    email_no: Option<&'static str>,
}

/// Requests new addresses from the `generate-email` endpoint.
#[derive(Debug, Clone)]
pub struct AddressGenerator {
    api: Api,
    modes: Vec<GenerationMode>,
}

impl AddressGenerator {
    /// Generate addresses of the given flavours.
    pub fn new(api: Api, modes: Vec<GenerationMode>) -> Self {
        Self { api, modes }
    }

    /// Modes posted with every request.
    pub fn modes(&self) -> &[GenerationMode] {
        &self.modes
    }

    /// Generate a single address.
    ///
    /// # Errors
    /// Transport errors for non-2xx answers, [`Error::ResponseParse`] when the body carries no
    /// usable address.
    pub async fn generate_email(&self) -> Result<String> {
        let emails = self.request(None).await?;
        if emails.len() > 1 {
            debug!(count = emails.len(), "vendor returned extra addresses, keeping the first");
        }
        emails
            .into_iter()
            .next()
            .ok_or_else(|| Error::parse(CONTEXT, "no address returned"))
    }

    /// Generate a batch of exactly `size.count()` distinct addresses.
    pub async fn generate_bulk_emails(&self, size: BulkSize) -> Result<Vec<String>> {
        let emails = self.request(Some(size)).await?;

        if emails.len() != size.count() {
            return Err(Error::parse(
                CONTEXT,
                format!("expected {} addresses, got {}", size.count(), emails.len()),
            ));
        }

        let mut seen = HashSet::with_capacity(emails.len());
        if let Some(duplicate) = emails.iter().find(|email| !seen.insert(email.as_str())) {
            return Err(Error::parse(
                CONTEXT,
                format!("duplicate address `{duplicate}` in batch"),
            ));
        }

        Ok(emails)
    }

    async fn request(&self, size: Option<BulkSize>) -> Result<Vec<String>> {
        let request = GenerateRequest {
            email: &self.modes,
            email_no: size.map(BulkSize::as_param),
        };
        debug!(modes = ?self.modes, size = ?size, "generating addresses");

        let body = self.api.post_json(CONTEXT, ENDPOINT, &request).await?;
        parse_email_response(CONTEXT, &body)
    }
}
