//! Adaptive radix tree over 8-byte big-endian key encodings (spec §4.2).
//!
//! This module only manages the tree's shape — which chain lives at which
//! key — and knows nothing about transactions or visibility. Callers
//! (`ArtIndex` in the parent module) resolve a chain against a reader's
//! snapshot.

use std::sync::Arc;

use babydb_core::types::{Key, RangeInfo, RowId, TxnId};
use parking_lot::RwLock;

use super::node::{Child, InnerNode, NodeBody};
use crate::chain::VersionChain;

fn encode_key(key: Key) -> [u8; 8] {
    key.to_be_bytes()
}

/// The tree itself. A single latch over the root guards every structural
/// mutation; the hot path under concurrency — visibility checks and
/// writes against a chain that already exists — never takes it past the
/// initial descent, since chain-level latching (spec §4.1) is what
/// actually serializes concurrent access to a key's history.
#[derive(Default)]
pub(crate) struct ArtTree {
    root: RwLock<Option<Child>>,
}

impl ArtTree {
    pub fn new() -> Self {
        ArtTree {
            root: RwLock::new(None),
        }
    }

    /// Find the chain for `key`, if any, without creating one.
    pub fn find_chain(&self, key: Key) -> Option<Arc<VersionChain>> {
        let bytes = encode_key(key);
        let root = self.root.read();
        let mut current = root.as_ref()?;
        let mut depth = 0usize;
        loop {
            match current {
                Child::Leaf(leaf_key, chain) => {
                    return if *leaf_key == key {
                        Some(chain.clone())
                    } else {
                        None
                    };
                }
                Child::Inner(inner) => {
                    let plen = inner.prefix.len();
                    if inner.prefix[..] != bytes[depth..depth + plen] {
                        return None;
                    }
                    depth += plen;
                    let byte = bytes[depth];
                    current = inner.body.get(byte)?;
                    depth += 1;
                }
            }
        }
    }

    /// Find the chain for `key`, creating an empty-history chain carrying
    /// a single uncommitted version if this is the key's first write.
    /// Returns the chain and whether it was newly created.
    pub fn get_or_insert_chain(
        &self,
        key: Key,
        row_id: RowId,
        txn_id: TxnId,
    ) -> (Arc<VersionChain>, bool) {
        let bytes = encode_key(key);
        let mut root = self.root.write();
        match root.as_mut() {
            None => {
                let chain = Arc::new(VersionChain::with_uncommitted(row_id, txn_id));
                *root = Some(Child::Leaf(key, chain.clone()));
                (chain, true)
            }
            Some(child) => Self::get_or_insert(child, key, &bytes, 0, row_id, txn_id),
        }
    }

    /// Descend (and, where needed, restructure) below `child`, inserting
    /// a leaf for `key` at `key_bytes[depth..]` if none exists yet.
    fn get_or_insert(
        child: &mut Child,
        key: Key,
        key_bytes: &[u8; 8],
        depth: usize,
        row_id: RowId,
        txn_id: TxnId,
    ) -> (Arc<VersionChain>, bool) {
        match child {
            Child::Leaf(existing_key, existing_chain) => {
                if *existing_key == key {
                    (existing_chain.clone(), false)
                } else {
                    let existing_bytes = encode_key(*existing_key);
                    let mut split_at = depth;
                    while split_at < 8 && existing_bytes[split_at] == key_bytes[split_at] {
                        split_at += 1;
                    }
                    debug_assert!(
                        split_at < 8,
                        "distinct keys must diverge within their fixed-width encoding"
                    );
                    let common_prefix = key_bytes[depth..split_at].to_vec();
                    let mut inner = InnerNode::new(common_prefix);
                    let new_chain = Arc::new(VersionChain::with_uncommitted(row_id, txn_id));
                    inner.body.insert(
                        existing_bytes[split_at],
                        Child::Leaf(*existing_key, existing_chain.clone()),
                    );
                    inner
                        .body
                        .insert(key_bytes[split_at], Child::Leaf(key, new_chain.clone()));
                    *child = Child::Inner(inner);
                    (new_chain, true)
                }
            }
            Child::Inner(inner) => {
                let plen = inner.prefix.len();
                let mut match_len = 0;
                while match_len < plen && inner.prefix[match_len] == key_bytes[depth + match_len] {
                    match_len += 1;
                }
                if match_len < plen {
                    // The new key diverges inside this node's compressed prefix:
                    // split the prefix and demote the existing node below a new
                    // branch point.
                    let diverging_byte = inner.prefix[match_len];
                    let demoted_prefix = inner.prefix[match_len + 1..].to_vec();
                    let common_prefix = key_bytes[depth..depth + match_len].to_vec();

                    let demoted_body = std::mem::replace(&mut inner.body, NodeBody::empty());
                    let demoted = InnerNode {
                        prefix: demoted_prefix,
                        body: demoted_body,
                    };

                    let mut split_body = NodeBody::empty();
                    split_body.insert(diverging_byte, Child::Inner(demoted));
                    let new_chain = Arc::new(VersionChain::with_uncommitted(row_id, txn_id));
                    let new_leaf_byte = key_bytes[depth + match_len];
                    split_body.insert(new_leaf_byte, Child::Leaf(key, new_chain.clone()));

                    *child = Child::Inner(InnerNode {
                        prefix: common_prefix,
                        body: split_body,
                    });
                    (new_chain, true)
                } else {
                    let next_depth = depth + plen;
                    let byte = key_bytes[next_depth];
                    if inner.body.get(byte).is_some() {
                        let existing = inner.body.get_mut(byte).expect("just checked present");
                        Self::get_or_insert(existing, key, key_bytes, next_depth + 1, row_id, txn_id)
                    } else {
                        let new_chain = Arc::new(VersionChain::with_uncommitted(row_id, txn_id));
                        inner.body.insert(byte, Child::Leaf(key, new_chain.clone()));
                        (new_chain, true)
                    }
                }
            }
        }
    }

    /// All `(key, chain)` pairs whose key falls in `range`, in ascending
    /// key order.
    pub fn scan_range(&self, range: RangeInfo) -> Vec<(Key, Arc<VersionChain>)> {
        let mut out = Vec::new();
        let root = self.root.read();
        if let Some(child) = root.as_ref() {
            Self::collect(child, range, &mut out);
        }
        out
    }

    fn collect(child: &Child, range: RangeInfo, out: &mut Vec<(Key, Arc<VersionChain>)>) {
        match child {
            Child::Leaf(key, chain) => {
                if range.contains(*key) {
                    out.push((*key, chain.clone()));
                }
            }
            Child::Inner(inner) => {
                for (_, next) in inner.body.iter() {
                    Self::collect(next, range, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find_same_key() {
        let tree = ArtTree::new();
        let (chain, created) = tree.get_or_insert_chain(42, 7, 100);
        assert!(created);
        assert_eq!(chain.search(0, 100), 7);
        let found = tree.find_chain(42).expect("just inserted");
        assert_eq!(found.search(0, 100), 7);
    }

    #[test]
    fn second_insert_of_same_key_returns_existing_chain() {
        let tree = ArtTree::new();
        let (first, _) = tree.get_or_insert_chain(42, 7, 100);
        let (second, created) = tree.get_or_insert_chain(42, 8, 200);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn lookup_of_missing_key_is_none() {
        let tree = ArtTree::new();
        tree.get_or_insert_chain(42, 7, 100);
        assert!(tree.find_chain(43).is_none());
    }

    #[test]
    fn keys_sharing_a_byte_prefix_diverge_correctly() {
        let tree = ArtTree::new();
        // 0x00...0100 and 0x00...0200 share the first 6 bytes.
        tree.get_or_insert_chain(0x0000_0000_0000_0100, 1, 100);
        tree.get_or_insert_chain(0x0000_0000_0000_0200, 2, 100);
        tree.get_or_insert_chain(0x0000_0000_0000_0300, 3, 100);

        assert_eq!(
            tree.find_chain(0x0000_0000_0000_0100).unwrap().search(0, 100),
            1
        );
        assert_eq!(
            tree.find_chain(0x0000_0000_0000_0200).unwrap().search(0, 100),
            2
        );
        assert_eq!(
            tree.find_chain(0x0000_0000_0000_0300).unwrap().search(0, 100),
            3
        );
        assert!(tree.find_chain(0x0000_0000_0000_0400).is_none());
    }

    #[test]
    fn scan_range_returns_ascending_keys_within_bounds() {
        let tree = ArtTree::new();
        for (k, r) in [(5u64, 1u64), (1, 2), (10, 3), (7, 4), (20, 5)] {
            tree.get_or_insert_chain(k, r, 100);
        }
        let found = tree.scan_range(RangeInfo::inclusive(5, 10));
        let keys: Vec<Key> = found.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![5, 7, 10]);
    }

    #[test]
    fn growth_through_every_fanout_preserves_all_keys() {
        let tree = ArtTree::new();
        // Exceed 256 distinct first-divergent bytes to force Node4 -> 16 ->
        // 48 -> 256 growth along some path.
        for i in 0u64..300 {
            tree.get_or_insert_chain(i, i, 100);
        }
        for i in 0u64..300 {
            let chain = tree.find_chain(i).unwrap_or_else(|| panic!("missing key {i}"));
            assert_eq!(chain.search(0, 100), i);
        }
    }
}
