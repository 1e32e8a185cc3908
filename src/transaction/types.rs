/// Transaction types as delivered by the Ledger Service
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender used by the Ledger Service for mining reward transactions
pub const REWARD_SENDER: &str = "system";

/// A transaction recorded inside a block.
///
/// Field names follow the Ledger Service's JSON encoding (`ID`, `Sender`,
/// `Recipient`, `Amount`, `Timestamp`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Sender")]
    pub sender: String,
    #[serde(rename = "Recipient")]
    pub recipient: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    /// Seconds since the Unix epoch
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        timestamp: i64,
    ) -> Self {
        Transaction {
            id: id.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            timestamp,
        }
    }

    /// Whether this is the reward the Ledger Service appends when mining
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Timestamp as a UTC date, `None` when out of chrono's range
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
