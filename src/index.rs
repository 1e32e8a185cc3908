//! Derived lookup structures over a ledger snapshot.
//!
//! A `LedgerIndex` is built once per snapshot in a single pass and then
//! answers queries without touching the chain again:
//! - the global transaction feed, most recent first
//! - transaction id to containing block index
//!
//! The index belongs to exactly one snapshot. When the snapshot is replaced
//! the index is rebuilt from scratch, never patched.

use crate::blockchain::{LedgerSnapshot, SnapshotId};
use crate::error::LedgerError;
use crate::transaction::Transaction;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A transaction tagged with the `index` of the block that holds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTransaction {
    pub transaction: Transaction,
    pub block_index: u64,
}

#[derive(Debug, Clone)]
pub struct LedgerIndex {
    snapshot_id: SnapshotId,
    feed: Vec<IndexedTransaction>,
    locations: HashMap<String, u64>,
    duplicates: Vec<String>,
}

impl LedgerIndex {
    pub fn build(snapshot: &LedgerSnapshot) -> Self {
        let mut feed = Vec::with_capacity(snapshot.transaction_count());
        let mut locations = HashMap::with_capacity(snapshot.transaction_count());
        let mut duplicates = Vec::new();

        for block in snapshot.blocks() {
            for tx in &block.transactions {
                match locations.entry(tx.id.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(block.index);
                        feed.push(IndexedTransaction {
                            transaction: tx.clone(),
                            block_index: block.index,
                        });
                    }
                    // First occurrence in chain order wins.
                    Entry::Occupied(first) => {
                        warn!(
                            tx_id = %tx.id,
                            first_block = *first.get(),
                            duplicate_block = block.index,
                            "duplicate transaction id in snapshot"
                        );
                        duplicates.push(tx.id.clone());
                    }
                }
            }
        }

        // sort_by is stable: equal timestamps keep block order, then in-block order
        feed.sort_by(|a, b| b.transaction.timestamp.cmp(&a.transaction.timestamp));

        debug!(
            snapshot = %snapshot.id(),
            transactions = feed.len(),
            duplicates = duplicates.len(),
            "ledger index built"
        );

        LedgerIndex {
            snapshot_id: snapshot.id(),
            feed,
            locations,
            duplicates,
        }
    }

    /// Every transaction in the snapshot, newest first.
    pub fn all_transactions(&self) -> &[IndexedTransaction] {
        &self.feed
    }

    /// Index of the block containing `transaction_id`.
    ///
    /// Returns `NotFound` for ids not in the snapshot, which typically means
    /// the transaction is still pending.
    pub fn find_block_of(&self, transaction_id: &str) -> Result<u64, LedgerError> {
        self.locations.get(transaction_id).copied().ok_or_else(|| {
            LedgerError::NotFound(format!("Transaction {} is not in any block", transaction_id))
        })
    }

    pub fn contains(&self, transaction_id: &str) -> bool {
        self.locations.contains_key(transaction_id)
    }

    /// Ids that appeared more than once; later copies were left out of the
    /// index. One entry per extra occurrence, in chain order.
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.feed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }

    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot_id
    }

    /// Whether this index was built from `snapshot` (by content identity).
    pub fn is_for(&self, snapshot: &LedgerSnapshot) -> bool {
        self.snapshot_id == snapshot.id()
    }
}

/// One-off feed query. Prefer keeping a `LedgerIndex` when querying repeatedly.
pub fn all_transactions(snapshot: &LedgerSnapshot) -> Vec<IndexedTransaction> {
    LedgerIndex::build(snapshot).feed
}

/// One-off block lookup. Prefer keeping a `LedgerIndex` when querying repeatedly.
pub fn find_block_of(snapshot: &LedgerSnapshot, transaction_id: &str) -> Result<u64, LedgerError> {
    LedgerIndex::build(snapshot).find_block_of(transaction_id)
}
