use std::collections::HashMap;

use crate::path::{common_prefix_len, encode_path, to_nibbles};
use crate::rlp_encoding::{encode_bytes, encode_list, keccak256};
use crate::types::H256;

#[derive(Clone, Debug)]
enum TrieNode {
    Leaf(Vec<u8>, Vec<u8>),                      // (path, value)
    Extension(Vec<u8>, H256),                    // (path, child_hash)
    Branch([Option<H256>; 16], Option<Vec<u8>>), // (children, value)
}

/// An in-memory Merkle Patricia Trie builder.
///
/// Every child is referenced by hash, so proofs list one node per level.
pub struct MPTBuilder {
    nodes: HashMap<H256, Vec<u8>>,
    node_cache: HashMap<H256, TrieNode>,
    root: Option<H256>,
}

impl MPTBuilder {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            node_cache: HashMap::new(),
            root: None,
        }
    }

    /// Insert a key-value pair and return the new root
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> H256 {
        let nibbles = to_nibbles(key);
        let new_root = self.insert_at(self.root, &nibbles, value.to_vec());
        self.root = Some(new_root);
        new_root
    }

    fn insert_at(&mut self, node_hash: Option<H256>, path: &[u8], value: Vec<u8>) -> H256 {
        let Some(hash) = node_hash else {
            return self.create_leaf(path, value);
        };

        match self.node_cache[&hash].clone() {
            TrieNode::Leaf(leaf_path, leaf_value) => {
                let common_len = common_prefix_len(&leaf_path, path);
                if common_len == leaf_path.len() && common_len == path.len() {
                    return self.create_leaf(path, value);
                }

                let mut children: [Option<H256>; 16] = Default::default();
                let mut branch_value = None;
                for (p, v) in [(leaf_path.as_slice(), leaf_value), (path, value)] {
                    if common_len == p.len() {
                        branch_value = Some(v);
                    } else {
                        children[p[common_len] as usize] = Some(self.create_leaf(&p[common_len + 1..], v));
                    }
                }

                let branch = self.create_branch_node(children, branch_value);
                self.wrap_in_extension(&path[..common_len], branch)
            }
            TrieNode::Extension(ext_path, child_hash) => {
                let common_len = common_prefix_len(&ext_path, path);
                if common_len == ext_path.len() {
                    let new_child = self.insert_at(Some(child_hash), &path[common_len..], value);
                    return self.create_extension(&ext_path, new_child);
                }

                // split the extension at the first diverging nibble
                let mut children: [Option<H256>; 16] = Default::default();
                let old_tail = &ext_path[common_len + 1..];
                children[ext_path[common_len] as usize] = Some(if old_tail.is_empty() {
                    child_hash
                } else {
                    self.create_extension(old_tail, child_hash)
                });

                let mut branch_value = None;
                if common_len == path.len() {
                    branch_value = Some(value);
                } else {
                    children[path[common_len] as usize] = Some(self.create_leaf(&path[common_len + 1..], value));
                }

                let branch = self.create_branch_node(children, branch_value);
                self.wrap_in_extension(&path[..common_len], branch)
            }
            TrieNode::Branch(mut children, branch_value) => match path.split_first() {
                None => self.create_branch_node(children, Some(value)),
                Some((&nibble, tail)) => {
                    let idx = nibble as usize;
                    children[idx] = Some(self.insert_at(children[idx], tail, value));
                    self.create_branch_node(children, branch_value)
                }
            },
        }
    }

    fn wrap_in_extension(&mut self, path: &[u8], child: H256) -> H256 {
        if path.is_empty() {
            child
        } else {
            self.create_extension(path, child)
        }
    }

    fn store(&mut self, rlp: Vec<u8>, node: TrieNode) -> H256 {
        let hash = keccak256(&rlp);
        self.nodes.insert(hash, rlp);
        self.node_cache.insert(hash, node);
        hash
    }

    fn create_leaf(&mut self, path: &[u8], value: Vec<u8>) -> H256 {
        let rlp = encode_list(&[encode_bytes(&encode_path(path, true)), encode_bytes(&value)]);
        self.store(rlp, TrieNode::Leaf(path.to_vec(), value))
    }

    fn create_extension(&mut self, path: &[u8], child_hash: H256) -> H256 {
        let rlp = encode_list(&[encode_bytes(&encode_path(path, false)), encode_bytes(&child_hash)]);
        self.store(rlp, TrieNode::Extension(path.to_vec(), child_hash))
    }

    fn create_branch_node(&mut self, children: [Option<H256>; 16], value: Option<Vec<u8>>) -> H256 {
        let mut items: Vec<Vec<u8>> = children
            .iter()
            .map(|child| match child {
                Some(hash) => encode_bytes(hash),
                None => encode_bytes(&[]),
            })
            .collect();
        items.push(encode_bytes(value.as_deref().unwrap_or(&[])));

        self.store(encode_list(&items), TrieNode::Branch(children, value))
    }

    /// Get the current root hash, or the empty-trie root when nothing was inserted
    pub fn root(&self) -> H256 {
        self.root.unwrap_or_else(|| keccak256(&[0x80]))
    }

    /// Collect the nodes on the path to `key`.
    ///
    /// For an absent key the proof stops at the node that shows the key
    /// cannot be present, so it doubles as an exclusion proof.
    pub fn get_proof(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let nibbles = to_nibbles(key);
        let mut remaining = nibbles.as_slice();
        let mut proof = Vec::new();
        let mut current = self.root;

        while let Some(hash) = current {
            proof.push(self.nodes[&hash].clone());
            current = match &self.node_cache[&hash] {
                TrieNode::Leaf(..) => None,
                TrieNode::Extension(path, child) => {
                    if remaining.starts_with(path) {
                        remaining = &remaining[path.len()..];
                        Some(*child)
                    } else {
                        None
                    }
                }
                TrieNode::Branch(children, _) => match remaining.split_first() {
                    None => None,
                    Some((&nibble, tail)) => {
                        remaining = tail;
                        children[nibble as usize]
                    }
                },
            };
        }
        proof
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let nibbles = to_nibbles(key);
        let mut remaining = nibbles.as_slice();
        let mut hash = self.root?;

        loop {
            match &self.node_cache[&hash] {
                TrieNode::Leaf(path, value) => return (path == remaining).then(|| value.clone()),
                TrieNode::Extension(path, child) => {
                    remaining = remaining.strip_prefix(path.as_slice())?;
                    hash = *child;
                }
                TrieNode::Branch(children, value) => match remaining.split_first() {
                    None => return value.clone(),
                    Some((&nibble, tail)) => {
                        remaining = tail;
                        hash = children[nibble as usize]?;
                    }
                },
            }
        }
    }
}

impl Default for MPTBuilder {
    fn default() -> Self {
        Self::new()
    }
}
