// crates/hyperchain-store/src/block.rs
//
// DAG block: a batch of transactions produced by one validator on one shard,
// referencing the shard's tips at creation time.
//
// The content hash covers a canonical header with a fixed field order:
// shard_id, merkle_root, timestamp (ms), previous_hashes (sorted), producer.
// Signatures are made over the hash bytes and are not part of the hash.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hyperchain_core::{hash_hex, Address, BlockHash, Transaction};

use crate::merkle::merkle_root;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagBlock {
    shard_id: u32,
    transactions: Vec<Transaction>,
    producer: Address,
    previous_hashes: Vec<BlockHash>,
    timestamp: DateTime<Utc>,
    merkle_root: String,
    hash: BlockHash,
    #[serde(default)]
    signatures: BTreeMap<String, Vec<u8>>,
}

#[derive(Serialize)]
struct BlockHeader<'a> {
    shard_id: u32,
    merkle_root: &'a str,
    timestamp: i64,
    previous_hashes: &'a [BlockHash],
    producer: &'a str,
}

impl DagBlock {
    /// Build and hash a block. Parent hashes are sorted and deduplicated so
    /// the same tip set always yields the same hash.
    pub fn new(
        shard_id: u32,
        transactions: Vec<Transaction>,
        producer: impl Into<Address>,
        previous_hashes: impl IntoIterator<Item = BlockHash>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut previous_hashes: Vec<BlockHash> = previous_hashes.into_iter().collect();
        previous_hashes.sort();
        previous_hashes.dedup();

        let merkle_root = merkle_root(&transactions);
        let producer = producer.into();
        let hash = compute_hash(shard_id, &merkle_root, timestamp, &previous_hashes, &producer);

        Self {
            shard_id,
            transactions,
            producer,
            previous_hashes,
            timestamp,
            merkle_root,
            hash,
            signatures: BTreeMap::new(),
        }
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn previous_hashes(&self) -> &[BlockHash] {
        &self.previous_hashes
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn merkle_root(&self) -> &str {
        &self.merkle_root
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn signatures(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.signatures
    }

    /// Bytes every producer signature is made over.
    pub fn signing_message(&self) -> &[u8] {
        self.hash.as_bytes()
    }

    pub fn add_signature(&mut self, algorithm: impl Into<String>, signature: Vec<u8>) {
        self.signatures.insert(algorithm.into(), signature);
    }

    /// Hash of the block's actual contents: the merkle root is recomputed
    /// from the transactions, not taken from the stored field.
    pub fn content_hash(&self) -> BlockHash {
        compute_hash(
            self.shard_id,
            &merkle_root(&self.transactions),
            self.timestamp,
            &self.previous_hashes,
            &self.producer,
        )
    }

    /// Recompute the merkle root and content hash from the block's fields and
    /// compare them with the stored values. Catches blocks altered after
    /// hashing (e.g. on the wire).
    pub fn verify_hash(&self) -> bool {
        merkle_root(&self.transactions) == self.merkle_root && self.content_hash() == self.hash
    }
}

fn compute_hash(
    shard_id: u32,
    merkle_root: &str,
    timestamp: DateTime<Utc>,
    previous_hashes: &[BlockHash],
    producer: &str,
) -> BlockHash {
    let header = BlockHeader {
        shard_id,
        merkle_root,
        timestamp: timestamp.timestamp_millis(),
        previous_hashes,
        producer,
    };
    hash_hex(&serde_json::to_vec(&header).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::EMPTY_MERKLE_ROOT;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_hash_is_reproducible_with_fixed_clock() {
        let a = DagBlock::new(1, vec![], "val1", vec!["bb".to_string(), "aa".to_string()], at(1_000));
        let b = DagBlock::new(1, vec![], "val1", vec!["aa".to_string(), "bb".to_string()], at(1_000));
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.previous_hashes(), &["aa".to_string(), "bb".to_string()]);
        assert_eq!(a.merkle_root(), EMPTY_MERKLE_ROOT);
    }

    #[test]
    fn test_canonical_header_encoding() {
        let block = DagBlock::new(2, vec![], "val1", vec!["p".to_string()], at(5));
        let expected = hash_hex(
            format!(
                "{{\"shard_id\":2,\"merkle_root\":\"{}\",\"timestamp\":5,\"previous_hashes\":[\"p\"],\"producer\":\"val1\"}}",
                EMPTY_MERKLE_ROOT
            )
            .as_bytes(),
        );
        assert_eq!(block.hash(), &expected);
    }

    #[test]
    fn test_every_header_field_is_bound() {
        let base = DagBlock::new(0, vec![], "val1", vec![], at(1_000));
        let tx = Transaction::new("a", "b", 1.0, at(1));

        assert_ne!(base.hash(), DagBlock::new(1, vec![], "val1", vec![], at(1_000)).hash());
        assert_ne!(base.hash(), DagBlock::new(0, vec![tx], "val1", vec![], at(1_000)).hash());
        assert_ne!(base.hash(), DagBlock::new(0, vec![], "val2", vec![], at(1_000)).hash());
        assert_ne!(base.hash(), DagBlock::new(0, vec![], "val1", vec!["x".into()], at(1_000)).hash());
        assert_ne!(base.hash(), DagBlock::new(0, vec![], "val1", vec![], at(2_000)).hash());
    }

    #[test]
    fn test_signatures_do_not_change_hash() {
        let mut block = DagBlock::new(0, vec![], "val1", vec![], at(1_000));
        let hash = block.hash().clone();
        block.add_signature("ed25519", vec![7; 64]);
        assert_eq!(block.hash(), &hash);
        assert!(block.verify_hash());
        assert_eq!(block.signing_message(), hash.as_bytes());
    }

    #[test]
    fn test_tampered_block_fails_hash_check() {
        let block = DagBlock::new(0, vec![], "val1", vec![], at(1_000));
        let mut value = serde_json::to_value(&block).unwrap();
        value["producer"] = serde_json::json!("mallory");
        let tampered: DagBlock = serde_json::from_value(value).unwrap();

        assert!(block.verify_hash());
        assert!(!tampered.verify_hash());
    }

    #[test]
    fn test_content_hash_follows_altered_fields() {
        let block = DagBlock::new(0, vec![], "val1", vec![], at(1_000));
        assert_eq!(&block.content_hash(), block.hash());

        let mut value = serde_json::to_value(&block).unwrap();
        value["producer"] = serde_json::json!("mallory");
        let tampered: DagBlock = serde_json::from_value(value).unwrap();
        let rebuilt = DagBlock::new(0, vec![], "mallory", vec![], at(1_000));
        assert_eq!(&tampered.content_hash(), rebuilt.hash());
        assert_ne!(&tampered.content_hash(), tampered.hash());
    }
}
