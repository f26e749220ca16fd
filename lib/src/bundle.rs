use alloy_primitives::{Address, Bytes, B256, U256};
use rlp::Rlp;
use serde::{Deserialize, Serialize};

use crate::error::ProofError;
use crate::rlp_encoding::{encode_list, is_list};

/// Account proof plus one storage proof per requested slot, positionally.
///
/// Untrusted until it survives verification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofBundle {
    pub account_proof: Vec<Vec<u8>>,
    pub storage_proofs: Vec<Vec<Vec<u8>>>,
}

impl ProofBundle {
    pub fn new(account_proof: Vec<Vec<u8>>, storage_proofs: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            account_proof,
            storage_proofs,
        }
    }

    /// Decode `[account_nodes, slot_0_nodes, ..., slot_n_nodes]`, where each
    /// node is embedded as an RLP list.
    pub fn from_rlp(data: &[u8]) -> Result<Self, ProofError> {
        let outer = Rlp::new(data);
        if !outer.is_list() {
            return Err(ProofError::Rlp("bundle is not a list".into()));
        }
        let info = outer.payload_info()?;
        if info.header_len + info.value_len != data.len() {
            return Err(ProofError::Rlp("trailing bytes after bundle".into()));
        }

        let mut proofs = outer
            .iter()
            .map(|proof| decode_nodes(&proof))
            .collect::<Result<Vec<_>, _>>()?;
        if proofs.is_empty() {
            return Err(ProofError::ProofCount { expected: 1, got: 0 });
        }

        let account_proof = proofs.remove(0);
        Ok(Self::new(account_proof, proofs))
    }

    /// Encode into the layout read by [`ProofBundle::from_rlp`].
    pub fn to_rlp(&self) -> Vec<u8> {
        let proofs: Vec<Vec<u8>> = core::iter::once(&self.account_proof)
            .chain(&self.storage_proofs)
            .map(|nodes| encode_list(nodes))
            .collect();
        encode_list(&proofs)
    }

    /// Order the storage proofs of an `eth_getProof` response by `slots`.
    pub fn from_response(response: &ProofResponse, slots: &[U256]) -> Result<Self, ProofError> {
        let storage_proofs = slots
            .iter()
            .map(|slot| {
                response
                    .storage_proof
                    .iter()
                    .find(|entry| entry.key == *slot)
                    .map(|entry| entry.proof.iter().map(|node| node.to_vec()).collect())
                    .ok_or(ProofError::MissingSlot(*slot))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            response.account_proof.iter().map(|node| node.to_vec()).collect(),
            storage_proofs,
        ))
    }
}

fn decode_nodes(proof: &Rlp<'_>) -> Result<Vec<Vec<u8>>, ProofError> {
    if !proof.is_list() {
        return Err(ProofError::Rlp("proof is not a list of nodes".into()));
    }
    proof
        .iter()
        .map(|node| {
            let raw = node.as_raw();
            if is_list(raw) {
                Ok(raw.to_vec())
            } else {
                Err(ProofError::Rlp("trie node is not a list".into()))
            }
        })
        .collect()
}

/// One entry of `storageProof` in an `eth_getProof` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProofEntry {
    pub key: U256,
    /// Claimed by the prover; never trusted.
    pub value: U256,
    pub proof: Vec<Bytes>,
}

/// `eth_getProof` response shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub address: Address,
    pub account_proof: Vec<Bytes>,
    #[serde(default)]
    pub storage_hash: B256,
    pub storage_proof: Vec<StorageProofEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::encode_path;
    use crate::rlp_encoding::encode_bytes;

    fn node(tag: u8) -> Vec<u8> {
        encode_list(&[encode_bytes(&encode_path(&[tag & 0x0f], true)), encode_bytes(&[tag; 40])])
    }

    #[test]
    fn test_bundle_rlp_layout() {
        let bundle = ProofBundle::new(vec![node(1), node(2)], vec![vec![node(3)], vec![]]);
        let encoded = bundle.to_rlp();
        assert_eq!(ProofBundle::from_rlp(&encoded).unwrap(), bundle);
    }

    #[test]
    fn test_bundle_rejects_byte_string_nodes() {
        let encoded = encode_list(&[encode_list(&[encode_bytes(&node(1))])]);
        assert!(ProofBundle::from_rlp(&encoded).is_err());
    }

    #[test]
    fn test_bundle_rejects_empty_list() {
        assert!(matches!(
            ProofBundle::from_rlp(&encode_list(&[])),
            Err(ProofError::ProofCount { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_bundle_from_json_response() {
        let json = r#"{
            "address": "0x0655977feb2f289a4ab78af67bab0d17aab84367",
            "accountProof": ["0xc20102"],
            "balance": "0x0",
            "codeHash": "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
            "nonce": "0x1",
            "storageHash": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
            "storageProof": [
                {"key": "0x16", "value": "0x0", "proof": ["0xc20304"]},
                {"key": "0x15", "value": "0x1", "proof": []}
            ]
        }"#;
        let response: ProofResponse = serde_json::from_str(json).unwrap();

        let bundle = ProofBundle::from_response(&response, &[U256::from(21u64), U256::from(22u64)]).unwrap();
        assert_eq!(bundle.account_proof, vec![vec![0xc2, 0x01, 0x02]]);
        assert_eq!(bundle.storage_proofs, vec![vec![], vec![vec![0xc2, 0x03, 0x04]]]);

        assert!(matches!(
            ProofBundle::from_response(&response, &[U256::from(20u64)]),
            Err(ProofError::MissingSlot(_))
        ));
    }
}
