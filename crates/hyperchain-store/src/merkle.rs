// crates/hyperchain-store/src/merkle.rs
//
// Merkle commitment over a block's transaction hashes.
//
// Each level pairs adjacent hashes and hashes their concatenation; an odd
// trailing hash is paired with itself. The reduction repeats until a single
// hash remains. A block without transactions commits to the all-zero root.

use hyperchain_core::{hash_bytes, Transaction};

/// Root of an empty transaction list.
pub const EMPTY_MERKLE_ROOT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Reduce leaf hashes to a single root.
pub fn merkle_root_of(leaves: &[[u8; 32]]) -> Option<[u8; 32]> {
    if leaves.is_empty() {
        return None;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                let mut combined = [0u8; 64];
                combined[..32].copy_from_slice(&left);
                combined[32..].copy_from_slice(&right);
                hash_bytes(&combined)
            })
            .collect();
    }
    level.first().copied()
}

/// Hex merkle root over the ordered transaction hashes.
pub fn merkle_root(transactions: &[Transaction]) -> String {
    let leaves: Vec<[u8; 32]> = transactions.iter().map(Transaction::hash_bytes).collect();
    match merkle_root_of(&leaves) {
        Some(root) => hex::encode(root),
        None => EMPTY_MERKLE_ROOT.to_string(),
    }
}
