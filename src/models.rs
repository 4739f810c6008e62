//! Data returned by the Emailnator client.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An inbox entry as listed by Emailnator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Vendor message identifier, used to fetch the full body.
    #[serde(rename = "messageID")]
    pub message_id: String,
    /// Sender display name or address.
    #[serde(default)]
    pub from: String,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Relative receive time as rendered by the vendor (e.g. "Just Now").
    #[serde(default)]
    pub time: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.message_id, self.from, self.subject, self.time
        )
    }
}

/// Batch sizes accepted by the bulk generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BulkSize {
    /// 100 addresses.
    #[default]
    Hundred,
    /// 200 addresses.
    TwoHundred,
    /// 300 addresses.
    ThreeHundred,
}

impl BulkSize {
    /// Every supported size, smallest first.
    pub const ALL: [BulkSize; 3] = [
        BulkSize::Hundred,
        BulkSize::TwoHundred,
        BulkSize::ThreeHundred,
    ];

    /// Number of addresses in the batch.
    pub fn count(self) -> usize {
        match self {
            BulkSize::Hundred => 100,
            BulkSize::TwoHundred => 200,
            BulkSize::ThreeHundred => 300,
        }
    }

    /// The `emailNo` value sent to the vendor.
    pub fn as_param(self) -> &'static str {
        match self {
            BulkSize::Hundred => "100",
            BulkSize::TwoHundred => "200",
            BulkSize::ThreeHundred => "300",
        }
    }
}

impl fmt::Display for BulkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl TryFrom<usize> for BulkSize {
    type Error = Error;

    fn try_from(count: usize) -> Result<Self, Self::Error> {
        BulkSize::ALL
            .into_iter()
            .find(|size| size.count() == count)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "invalid bulk size {count}; must be one of 100, 200 or 300"
                ))
            })
    }
}

impl FromStr for BulkSize {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let count = raw.trim().parse::<usize>().map_err(|_| {
            Error::InvalidInput(format!(
                "invalid bulk size `{raw}`; must be one of 100, 200 or 300"
            ))
        })?;
        BulkSize::try_from(count)
    }
}

/// A freshly generated address together with its current messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inbox {
    /// The generated address.
    pub email: String,
    /// Messages listed for it, in vendor order.
    pub messages: Vec<Message>,
}

impl fmt::Display for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Email: {}", self.email)?;
        write!(f, "Messages: {}", self.messages.len())?;
        for message in &self.messages {
            write!(f, "\n  {message}")?;
        }
        Ok(())
    }
}
