use alloy_primitives::{Address, B256, U256};
use tracing::debug;

use crate::bundle::ProofBundle;
use crate::error::ProofError;
use crate::header::BlockHeader;
use crate::mpt::extract_proof_value;
use crate::rlp_encoding::keccak256;
use crate::types::{Account, TrustedRoot};

/// Authenticated slot values, in the order they were requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotValues {
    pub storage_root: B256,
    values: Vec<(U256, B256)>,
}

impl SlotValues {
    pub fn get(&self, slot: U256) -> Option<B256> {
        self.values.iter().find(|(s, _)| *s == slot).map(|(_, v)| *v)
    }

    pub fn values(&self) -> impl Iterator<Item = U256> + '_ {
        self.values.iter().map(|(_, v)| U256::from_be_bytes(v.0))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Prove the account leaf of `account` under `state_root`.
pub fn extract_account(
    state_root: &B256,
    account: Address,
    proof: &[Vec<u8>],
) -> Result<Account, ProofError> {
    let key = keccak256(account.as_slice());
    match extract_proof_value(&state_root.0, &key, proof)? {
        Some(leaf) => Account::decode(&leaf),
        None => Err(ProofError::AccountNotFound(account)),
    }
}

/// Prove one storage slot under `storage_root`. Absent slots read as zero.
pub fn extract_slot_value(
    storage_root: &B256,
    slot: U256,
    proof: &[Vec<u8>],
) -> Result<B256, ProofError> {
    let key = keccak256(&slot.to_be_bytes::<32>());
    let Some(leaf) = extract_proof_value(&storage_root.0, &key, proof)? else {
        return Ok(B256::ZERO);
    };

    let data = rlp::Rlp::new(&leaf)
        .data()
        .map_err(|_| ProofError::MalformedSlotValue { slot })?;
    if data.len() > 32 {
        return Err(ProofError::MalformedSlotValue { slot });
    }
    let mut word = [0u8; 32];
    word[32 - data.len()..].copy_from_slice(data);
    Ok(B256::from(word))
}

/// Verify `slots` of `account` against a state root that is already trusted.
///
/// Either every slot verifies against the same account storage root, or the
/// whole call fails.
pub fn verify_state_root(
    state_root: &B256,
    account: Address,
    slots: &[U256],
    bundle: &ProofBundle,
) -> Result<SlotValues, ProofError> {
    if bundle.storage_proofs.len() != slots.len() {
        return Err(ProofError::ProofCount {
            expected: slots.len() + 1,
            got: bundle.storage_proofs.len() + 1,
        });
    }

    let leaf = extract_account(state_root, account, &bundle.account_proof)?;
    let values = slots
        .iter()
        .zip(&bundle.storage_proofs)
        .map(|(slot, proof)| Ok((*slot, extract_slot_value(&leaf.storage_root, *slot, proof)?)))
        .collect::<Result<Vec<_>, ProofError>>()?;

    debug!(%account, storage_root = %leaf.storage_root, slots = values.len(), "storage proof verified");
    Ok(SlotValues {
        storage_root: leaf.storage_root,
        values,
    })
}

/// Verify against a trusted root using its recorded state root.
pub fn verify(
    root: &TrustedRoot,
    account: Address,
    slots: &[U256],
    bundle: &ProofBundle,
) -> Result<SlotValues, ProofError> {
    let state_root = root.state_root.ok_or(ProofError::UntrustedBlock {
        number: root.block_number,
        what: "state root",
    })?;
    verify_state_root(&state_root, account, slots, bundle)
}

/// Check `header_rlp` against the trusted block hash, then verify against the
/// state root it commits to.
pub fn verify_with_header(
    root: &TrustedRoot,
    header_rlp: &[u8],
    account: Address,
    slots: &[U256],
    bundle: &ProofBundle,
) -> Result<(BlockHeader, SlotValues), ProofError> {
    let header = BlockHeader::decode(header_rlp)?;
    let trusted = root
        .block_hash
        .filter(|_| root.block_number == header.number)
        .ok_or(ProofError::UntrustedBlock {
            number: header.number,
            what: "block hash",
        })?;
    if trusted != header.hash {
        return Err(ProofError::BlockHashMismatch {
            number: header.number,
            expected: trusted,
            got: header.hash,
        });
    }

    let values = verify_state_root(&header.state_root, account, slots, bundle)?;
    Ok((header, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::VaultState;
    use crate::path::encode_path;
    use crate::rlp_encoding::{encode_bytes, encode_list};

    fn vault() -> Address {
        Address::repeat_byte(0x42)
    }

    fn state() -> VaultState {
        let slots = [
            (U256::from(20u64), U256::from(10u64).pow(U256::from(18u64))),
            (U256::from(22u64), U256::from(3u64)),
            (U256::from(40u64), U256::from(1_700_000_000u64)),
        ];
        let decoys: Vec<Address> = (1u8..12).map(Address::repeat_byte).collect();
        VaultState::new(vault(), &slots, &decoys)
    }

    fn requested() -> Vec<U256> {
        [20u64, 21, 22, 40].map(U256::from).to_vec()
    }

    #[test]
    fn test_values_match_storage_bit_for_bit() {
        let state = state();
        let slots = requested();
        let values = verify_state_root(&state.state_root(), vault(), &slots, &state.bundle(&slots)).unwrap();

        assert_eq!(values.storage_root, state.account.storage_root);
        let got: Vec<U256> = values.values().collect();
        assert_eq!(
            got,
            vec![
                U256::from(10u64).pow(U256::from(18u64)),
                U256::ZERO, // slot 21 never written
                U256::from(3u64),
                U256::from(1_700_000_000u64),
            ]
        );
        assert_eq!(values.get(U256::from(22u64)), Some(B256::with_last_byte(3)));
    }

    #[test]
    fn test_tampered_storage_node_rejects_whole_call() {
        let state = state();
        let slots = requested();
        let mut bundle = state.bundle(&slots);
        let last = bundle.storage_proofs[2].len() - 1;
        let forged = encode_list(&[
            encode_bytes(&encode_path(&[0x1; 5], true)),
            encode_bytes(&[0x83, 0xff, 0xff, 0xff]),
        ]);
        bundle.storage_proofs[2][last] = forged;

        assert!(matches!(
            verify_state_root(&state.state_root(), vault(), &slots, &bundle),
            Err(ProofError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_flipped_account_byte_is_rejected() {
        let state = state();
        let slots = requested();
        let mut bundle = state.bundle(&slots);
        let last = bundle.account_proof.last_mut().unwrap();
        let idx = last.len() - 1;
        last[idx] ^= 0x01;

        assert!(verify_state_root(&state.state_root(), vault(), &slots, &bundle).is_err());
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let state = state();
        let slots = requested();
        let bundle = state.bundle(&slots);

        assert!(matches!(
            verify_state_root(&B256::repeat_byte(0x99), vault(), &slots, &bundle),
            Err(ProofError::HashMismatch { depth: 0 })
        ));
    }

    #[test]
    fn test_missing_account_is_rejected() {
        let state = state();
        let stranger = Address::repeat_byte(0xee);
        let bundle = ProofBundle::new(
            state.state_proof_for(stranger),
            vec![],
        );

        assert!(matches!(
            verify_state_root(&state.state_root(), stranger, &[], &bundle),
            Err(ProofError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_proof_count_must_match_slots() {
        let state = state();
        let slots = requested();
        let bundle = state.bundle(&slots[..2]);

        assert!(matches!(
            verify_state_root(&state.state_root(), vault(), &slots, &bundle),
            Err(ProofError::ProofCount { expected: 5, got: 3 })
        ));
    }

    #[test]
    fn test_verify_with_header_checks_trusted_hash() {
        let state = state();
        let slots = requested();
        let bundle = state.bundle(&slots);
        let header_rlp = state.header(100, 1_700_000_012);
        let hash = B256::from(keccak256(&header_rlp));

        let root = TrustedRoot {
            block_number: 100,
            block_hash: Some(hash),
            state_root: None,
        };
        let (header, values) = verify_with_header(&root, &header_rlp, vault(), &slots, &bundle).unwrap();
        assert_eq!(header.timestamp, 1_700_000_012);
        assert_eq!(values.len(), 4);

        let wrong = TrustedRoot {
            block_hash: Some(B256::repeat_byte(1)),
            ..root.clone()
        };
        assert!(matches!(
            verify_with_header(&wrong, &header_rlp, vault(), &slots, &bundle),
            Err(ProofError::BlockHashMismatch { .. })
        ));

        let other_block = TrustedRoot {
            block_number: 101,
            ..root
        };
        assert!(matches!(
            verify_with_header(&other_block, &header_rlp, vault(), &slots, &bundle),
            Err(ProofError::UntrustedBlock { .. })
        ));
    }

    #[test]
    fn test_verify_requires_state_root() {
        let state = state();
        let slots = requested();
        let root = TrustedRoot {
            block_number: 5,
            block_hash: Some(B256::repeat_byte(3)),
            state_root: None,
        };
        assert!(matches!(
            verify(&root, vault(), &slots, &state.bundle(&slots)),
            Err(ProofError::UntrustedBlock { number: 5, .. })
        ));

        let root = TrustedRoot {
            state_root: Some(state.state_root()),
            ..root
        };
        assert!(verify(&root, vault(), &slots, &state.bundle(&slots)).is_ok());
    }
}
