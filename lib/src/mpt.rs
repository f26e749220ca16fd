use alloy_primitives::{b256, B256};
use tracing::trace;

use crate::error::ProofError;
use crate::path::{decode_path, to_nibbles};
use crate::rlp_encoding::{decode_bytes, decode_list, is_list, keccak256};
use crate::types::{Node, NodeRef, H256};

/// Root of a trie with no entries: keccak256(rlp(""))
pub const EMPTY_TRIE_ROOT: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Decode one RLP-encoded trie node
pub fn decode_node(node_rlp: &[u8], depth: usize) -> Result<Node, ProofError> {
    let malformed = |reason| ProofError::MalformedNode { depth, reason };
    let items = decode_list(node_rlp)?;

    match items.len() {
        2 => {
            let encoded_path = decode_bytes(&items[0])?;
            let (path, is_leaf) = decode_path(&encoded_path).ok_or(malformed("bad path prefix"))?;
            if is_leaf {
                Ok(Node::Leaf(path, decode_bytes(&items[1])?))
            } else {
                if path.is_empty() {
                    return Err(malformed("extension with empty path"));
                }
                let child = decode_ref(&items[1], depth)?.ok_or(malformed("extension without child"))?;
                Ok(Node::Extension(path, child))
            }
        }
        17 => {
            let mut children: [Option<NodeRef>; 16] = Default::default();
            for (slot, item) in children.iter_mut().zip(&items[..16]) {
                *slot = decode_ref(item, depth)?;
            }
            let value = decode_bytes(&items[16])?;
            let value = (!value.is_empty()).then_some(value);
            Ok(Node::Branch(Box::new(children), value))
        }
        _ => Err(malformed("node is neither 2 nor 17 items")),
    }
}

/// Child reference held in a branch slot or extension: empty, a hash, or an
/// embedded node.
fn decode_ref(item: &[u8], depth: usize) -> Result<Option<NodeRef>, ProofError> {
    if is_list(item) {
        if item.len() >= 32 {
            return Err(ProofError::MalformedNode {
                depth,
                reason: "embedded child of 32 bytes or more",
            });
        }
        return Ok(Some(NodeRef::Inline(item.to_vec())));
    }

    let bytes = decode_bytes(item)?;
    match bytes.len() {
        0 => Ok(None),
        32 => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&bytes);
            Ok(Some(NodeRef::Hash(hash)))
        }
        _ => Err(ProofError::MalformedNode {
            depth,
            reason: "child reference is not a 32-byte hash",
        }),
    }
}

/// Walk a Merkle Patricia proof for `key` under `root`.
///
/// Returns `Some(value)` for an inclusion proof and `None` when the proof
/// demonstrates that the key is absent. Any break in hash linkage, malformed
/// node, node past the terminal one, or missing node rejects the proof.
///
/// # Arguments
/// * `root` - The trusted root hash of the trie
/// * `key` - The trie key (already hashed for secure tries)
/// * `proof` - RLP-encoded nodes from root towards the leaf
pub fn extract_proof_value(
    root: &H256,
    key: &[u8],
    proof: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, ProofError> {
    if proof.is_empty() {
        if *root == EMPTY_TRIE_ROOT.0 {
            return Ok(None);
        }
        return Err(ProofError::EmptyProof(B256::from(*root)));
    }

    let nibbles = to_nibbles(key);
    let value = walk_ref(&NodeRef::Hash(*root), &nibbles, proof, 0)?;
    trace!(nodes = proof.len(), included = value.is_some(), "proof walked");
    Ok(value)
}

fn walk_ref(
    expected: &NodeRef,
    key: &[u8],
    proof: &[Vec<u8>],
    depth: usize,
) -> Result<Option<Vec<u8>>, ProofError> {
    match expected {
        NodeRef::Hash(hash) => {
            let (node_rlp, rest) = proof.split_first().ok_or(ProofError::Truncated { depth })?;
            if keccak256(node_rlp) != *hash {
                return Err(ProofError::HashMismatch { depth });
            }
            walk_node(node_rlp, key, rest, depth)
        }
        NodeRef::Inline(node_rlp) => {
            // provers may or may not repeat an embedded node as its own entry
            let rest = match proof.split_first() {
                Some((first, rest)) if first == node_rlp => rest,
                _ => proof,
            };
            walk_node(node_rlp, key, rest, depth)
        }
    }
}

fn walk_node(
    node_rlp: &[u8],
    key: &[u8],
    rest: &[Vec<u8>],
    depth: usize,
) -> Result<Option<Vec<u8>>, ProofError> {
    let terminal = |value: Option<Vec<u8>>| {
        if rest.is_empty() {
            Ok(value)
        } else {
            Err(ProofError::TrailingNodes { depth })
        }
    };

    match decode_node(node_rlp, depth)? {
        Node::Leaf(path, value) => terminal((path == key).then_some(value)),
        Node::Extension(path, child) => {
            if !key.starts_with(&path) {
                // divergent extension: the key would have needed a branch here
                return terminal(None);
            }
            walk_ref(&child, &key[path.len()..], rest, depth + 1)
        }
        Node::Branch(children, value) => match key.split_first() {
            None => terminal(value),
            Some((&nibble, tail)) => match &children[nibble as usize] {
                None => terminal(None),
                Some(child) => walk_ref(child, tail, rest, depth + 1),
            },
        },
    }
}

/// Get the reference a parent would hold for this node
pub fn hash_node(node_rlp: &[u8]) -> NodeRef {
    if node_rlp.len() < 32 {
        NodeRef::Inline(node_rlp.to_vec())
    } else {
        NodeRef::Hash(keccak256(node_rlp))
    }
}
