//! Hash-chain integrity checks over a ledger snapshot.
//!
//! The validator never stops at the first problem: every offending block is
//! reported so a viewer can highlight all of them at once. A broken chain is
//! an ordinary result, not an error.

use serde::{Deserialize, Serialize};

use super::chain::{Block, LedgerSnapshot};

/// Optional checks on top of the Ledger Service's own rule set.
///
/// All flags default to off, which reproduces the service's behaviour:
/// genesis is accepted as-is and only linkage and difficulty are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Also require the genesis block to meet its own difficulty.
    #[serde(default)]
    pub genesis_proof_of_work: bool,
    /// Require each block's `index` to equal its chain position.
    #[serde(default)]
    pub check_index_sequence: bool,
    /// Recompute every non-genesis digest and compare it with `hash`.
    #[serde(default)]
    pub recompute_hashes: bool,
}

impl ValidationPolicy {
    /// Every optional check turned on.
    pub fn strict() -> Self {
        ValidationPolicy {
            genesis_proof_of_work: true,
            check_index_sequence: true,
            recompute_hashes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum IssueKind {
    #[serde(rename_all = "camelCase")]
    BrokenLink { expected: String, found: String },
    #[serde(rename_all = "camelCase")]
    DifficultyNotMet { required: u32 },
    #[serde(rename_all = "camelCase")]
    IndexOutOfSequence { expected: u64, found: u64 },
    #[serde(rename_all = "camelCase")]
    HashMismatch { computed: String },
}

/// One recorded validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub block_index: u64,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl Issue {
    /// Human readable explanation, suitable for listing next to the block.
    pub fn describe(&self) -> String {
        match &self.kind {
            IssueKind::BrokenLink { .. } => {
                "Previous hash does not match the hash of the previous block".to_string()
            }
            IssueKind::DifficultyNotMet { required } => format!(
                "Hash does not meet difficulty requirement of {} leading zeros",
                required
            ),
            IssueKind::IndexOutOfSequence { expected, found } => format!(
                "Block index {} is out of sequence (expected {})",
                found, expected
            ),
            IssueKind::HashMismatch { computed } => format!(
                "Stored hash does not match the recomputed digest {}",
                computed
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff `issues` is empty
    pub valid: bool,
    /// The snapshot held no blocks at all
    pub is_empty: bool,
    /// Ordered by chain position
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn from_issues(is_empty: bool, issues: Vec<Issue>) -> Self {
        ValidationReport {
            valid: issues.is_empty(),
            is_empty,
            issues,
        }
    }

    pub fn message(&self) -> &'static str {
        if self.is_empty {
            "Blockchain has no blocks."
        } else if self.valid {
            "Blockchain is valid. All blocks are properly linked and have valid hashes."
        } else {
            "Blockchain validation failed. See issues below."
        }
    }

    /// Block indices with at least one issue, in chain order, without repeats.
    pub fn flagged_blocks(&self) -> Vec<u64> {
        let mut flagged: Vec<u64> = self.issues.iter().map(|i| i.block_index).collect();
        flagged.dedup();
        flagged
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChainValidator {
    policy: ValidationPolicy,
}

impl ChainValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        ChainValidator { policy }
    }

    pub fn validate(&self, snapshot: &LedgerSnapshot) -> ValidationReport {
        let blocks = snapshot.blocks();
        let mut issues = Vec::new();

        if let Some(genesis) = blocks.first() {
            if self.policy.check_index_sequence && genesis.index != 0 {
                issues.push(Issue {
                    block_index: genesis.index,
                    kind: IssueKind::IndexOutOfSequence {
                        expected: 0,
                        found: genesis.index,
                    },
                });
            }
            if self.policy.genesis_proof_of_work && !genesis.meets_difficulty() {
                issues.push(difficulty_issue(genesis));
            }
        }

        for (position, pair) in blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let expected_index = position as u64 + 1;

            if self.policy.check_index_sequence && current.index != expected_index {
                issues.push(Issue {
                    block_index: current.index,
                    kind: IssueKind::IndexOutOfSequence {
                        expected: expected_index,
                        found: current.index,
                    },
                });
            }

            if current.previous_hash != previous.hash {
                issues.push(Issue {
                    block_index: current.index,
                    kind: IssueKind::BrokenLink {
                        expected: previous.hash.clone(),
                        found: current.previous_hash.clone(),
                    },
                });
            }

            if !current.meets_difficulty() {
                issues.push(difficulty_issue(current));
            }

            if self.policy.recompute_hashes {
                let computed = current.compute_hash();
                if computed != current.hash {
                    issues.push(Issue {
                        block_index: current.index,
                        kind: IssueKind::HashMismatch { computed },
                    });
                }
            }
        }

        ValidationReport::from_issues(blocks.is_empty(), issues)
    }
}

fn difficulty_issue(block: &Block) -> Issue {
    Issue {
        block_index: block.index,
        kind: IssueKind::DifficultyNotMet {
            required: block.difficulty,
        },
    }
}

/// Validate with the default policy.
pub fn validate(snapshot: &LedgerSnapshot) -> ValidationReport {
    ChainValidator::default().validate(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    fn block(index: u64, hash: &str, previous_hash: &str, difficulty: u32) -> Block {
        Block {
            index,
            timestamp: 1_700_000_000 + index as i64,
            transactions: vec![],
            previous_hash: previous_hash.to_string(),
            hash: hash.to_string(),
            nonce: 0,
            difficulty,
        }
    }

    fn snapshot(blocks: Vec<Block>) -> LedgerSnapshot {
        LedgerSnapshot::from_chain(blocks).unwrap()
    }

    #[test]
    fn test_empty_chain_is_valid_and_flagged_empty() {
        let report = validate(&snapshot(vec![]));
        assert!(report.valid);
        assert!(report.is_empty);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_lone_genesis_is_valid_even_with_bad_hash() {
        let report = validate(&snapshot(vec![block(0, "ffff", "", 4)]));
        assert!(report.valid);
        assert!(!report.is_empty);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_example_scenario_reports_single_difficulty_issue() {
        let chain = snapshot(vec![
            block(0, "0a1", "", 0),
            block(1, "0000b2", "0a1", 4),
            block(2, "badhash", "0000b2", 2),
        ]);

        let report = validate(&chain);
        assert!(!report.valid);
        assert_eq!(
            report.issues,
            vec![Issue {
                block_index: 2,
                kind: IssueKind::DifficultyNotMet { required: 2 },
            }]
        );
    }

    #[test]
    fn test_does_not_stop_at_first_failure() {
        let chain = snapshot(vec![
            block(0, "0a1", "", 1),
            block(1, "00b2", "wrong", 2),
            block(2, "0c3", "00b2", 2),
            block(3, "00d4", "also-wrong", 2),
        ]);

        let report = validate(&chain);
        let kinds: Vec<(u64, &str)> = report
            .issues
            .iter()
            .map(|i| {
                let name = match i.kind {
                    IssueKind::BrokenLink { .. } => "link",
                    IssueKind::DifficultyNotMet { .. } => "pow",
                    _ => "other",
                };
                (i.block_index, name)
            })
            .collect();
        assert_eq!(kinds, vec![(1, "link"), (2, "pow"), (3, "link")]);
        assert_eq!(report.flagged_blocks(), vec![1, 2, 3]);
    }

    #[test]
    fn test_broken_link_carries_both_hashes() {
        let chain = snapshot(vec![block(0, "0a", "", 0), block(1, "0b", "zz", 1)]);
        let report = validate(&chain);
        assert_eq!(
            report.issues[0].kind,
            IssueKind::BrokenLink {
                expected: "0a".to_string(),
                found: "zz".to_string(),
            }
        );
    }

    #[test]
    fn test_hash_shorter_than_difficulty_fails() {
        let chain = snapshot(vec![block(0, "0", "", 0), block(1, "00", "0", 3)]);
        let report = validate(&chain);
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0].kind,
            IssueKind::DifficultyNotMet { required: 3 }
        ));
    }

    #[test]
    fn test_zero_difficulty_accepts_any_hash() {
        let chain = snapshot(vec![block(0, "ab", "", 0), block(1, "cd", "ab", 0)]);
        assert!(validate(&chain).valid);
    }

    #[test]
    fn test_genesis_policy_checks_genesis_difficulty() {
        let chain = snapshot(vec![block(0, "ffff", "", 2)]);
        let validator = ChainValidator::new(ValidationPolicy {
            genesis_proof_of_work: true,
            ..Default::default()
        });

        let report = validator.validate(&chain);
        assert!(!report.valid);
        assert_eq!(report.issues[0].block_index, 0);
    }

    #[test]
    fn test_sequence_policy_reports_gaps() {
        let chain = snapshot(vec![
            block(0, "0a", "", 1),
            block(1, "0b", "0a", 1),
            block(5, "0c", "0b", 1),
        ]);

        assert!(validate(&chain).valid);

        let validator = ChainValidator::new(ValidationPolicy {
            check_index_sequence: true,
            ..Default::default()
        });
        let report = validator.validate(&chain);
        assert_eq!(
            report.issues,
            vec![Issue {
                block_index: 5,
                kind: IssueKind::IndexOutOfSequence {
                    expected: 2,
                    found: 5,
                },
            }]
        );
    }

    #[test]
    fn test_recompute_policy_detects_tampered_transactions() {
        let genesis = block(0, "0a", "", 0);
        let mut mined = block(1, "", "0a", 0);
        mined.transactions = vec![Transaction::new("tx-1", "alice", "bob", 3.0, 10)];
        mined.hash = mined.compute_hash();

        let validator = ChainValidator::new(ValidationPolicy {
            recompute_hashes: true,
            ..Default::default()
        });
        assert!(validator.validate(&snapshot(vec![genesis.clone(), mined.clone()])).valid);

        mined.transactions[0].id = "tx-forged".to_string();
        let report = validator.validate(&snapshot(vec![genesis, mined]));
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(report.issues[0].kind, IssueKind::HashMismatch { .. }));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let chain = snapshot(vec![
            block(0, "0a1", "", 0),
            block(1, "b2", "nope", 3),
            block(2, "c3", "b2", 1),
        ]);
        let first = validate(&chain);
        let second = validate(&chain);
        assert_eq!(first, second);
        assert_eq!(first.issues.len(), 3);
    }

    #[test]
    fn test_report_serializes_in_host_shape() {
        let chain = snapshot(vec![block(0, "0a1", "", 0), block(1, "x", "0a1", 2)]);
        let json = serde_json::to_value(validate(&chain)).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["isEmpty"], false);
        assert_eq!(json["issues"][0]["blockIndex"], 1);
        assert_eq!(json["issues"][0]["kind"], "DifficultyNotMet");
        assert_eq!(json["issues"][0]["required"], 2);
    }
}
