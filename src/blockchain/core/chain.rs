use crate::error::LedgerError;
use crate::transaction::Transaction;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub type Sha256Hash = [u8; 32];

/// A block as delivered by the Ledger Service.
///
/// Field names follow the service's JSON encoding. Nothing here is checked
/// on construction; chain integrity is the validator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "Index")]
    pub index: u64,
    /// Seconds since the Unix epoch
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Transactions", default, deserialize_with = "null_as_empty")]
    pub transactions: Vec<Transaction>,
    /// Empty for the genesis block
    #[serde(rename = "PreviousHash", default)]
    pub previous_hash: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "Nonce")]
    pub nonce: u64,
    /// Required number of leading '0' characters in `hash`
    #[serde(rename = "Difficulty")]
    pub difficulty: u32,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Transaction>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Transaction>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Whether `hash` starts with at least `difficulty` '0' characters.
    pub fn meets_difficulty(&self) -> bool {
        let required = self.difficulty as usize;
        self.hash.len() >= required && self.hash.bytes().take(required).all(|b| b == b'0')
    }

    /// Recomputes the digest the Ledger Service assigns to this block:
    /// SHA-256 over index, timestamp, previous hash, nonce and every
    /// transaction id, concatenated as text, encoded as lowercase hex.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_string());
        hasher.update(self.timestamp.to_string());
        hasher.update(&self.previous_hash);
        hasher.update(self.nonce.to_string());
        for tx in &self.transactions {
            hasher.update(&tx.id);
        }
        hex::encode(hasher.finalize())
    }
}

/// Content fingerprint of a snapshot, used as its identity by caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub Sha256Hash);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for SnapshotId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// An immutable, point-in-time copy of the chain.
///
/// A refresh never mutates a snapshot; it builds a new one and the holder
/// swaps it in whole.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    chain: Vec<Block>,
    id: SnapshotId,
}

impl LedgerSnapshot {
    /// Build a snapshot from already-typed blocks.
    ///
    /// Only schema constraints are checked here (transaction amounts must be
    /// finite and non-negative); hash linkage and proof-of-work are left to
    /// the validator.
    pub fn from_chain(blocks: Vec<Block>) -> Result<Self, LedgerError> {
        for block in &blocks {
            for tx in &block.transactions {
                tx.validate_schema().map_err(|e| match e {
                    LedgerError::MalformedInput(msg) => {
                        LedgerError::MalformedInput(format!("Block {}: {}", block.index, msg))
                    }
                    other => other,
                })?;
            }
        }

        let encoded = serde_json::to_vec(&blocks)?;
        let id = SnapshotId(Sha256::digest(&encoded).into());

        Ok(LedgerSnapshot { chain: blocks, id })
    }

    /// Parse the Ledger Service's `{ "chain": [...] }` payload. A bare array
    /// of blocks is accepted as well.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, LedgerError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LedgerError> {
        let chain = match value {
            serde_json::Value::Object(mut payload) => payload.remove("chain").ok_or_else(|| {
                LedgerError::MalformedInput("Payload has no `chain` field".to_string())
            })?,
            array @ serde_json::Value::Array(_) => array,
            other => {
                return Err(LedgerError::MalformedInput(format!(
                    "Expected an object with a `chain` field or an array of blocks, got {}",
                    json_kind(&other)
                )))
            }
        };

        if !chain.is_array() {
            return Err(LedgerError::MalformedInput(format!(
                "`chain` must be an array of blocks, got {}",
                json_kind(&chain)
            )));
        }

        let blocks: Vec<Block> = serde_json::from_value(chain)?;
        Self::from_chain(blocks)
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn genesis(&self) -> Option<&Block> {
        self.chain.first()
    }

    pub fn tip(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Block at chain position `position` (not necessarily its `index` field
    /// if the source delivered a gapped chain).
    pub fn block(&self, position: usize) -> Option<&Block> {
        self.chain.get(position)
    }

    pub fn transaction_count(&self) -> usize {
        self.chain.iter().map(|b| b.transactions.len()).sum()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
