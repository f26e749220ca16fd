use alloy_primitives::{B256, U256};
use rlp::Rlp;

use crate::error::ProofError;
use crate::rlp_encoding::keccak256;
use crate::types::Account;

const HEADER_STATE_ROOT_INDEX: usize = 3;
const HEADER_NUMBER_INDEX: usize = 8;
const HEADER_TIMESTAMP_INDEX: usize = 11;

/// Fields of a block header needed to anchor a state proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: B256,
    pub parent_hash: B256,
    pub state_root: B256,
    pub number: u64,
    pub timestamp: u64,
}

impl BlockHeader {
    /// Parse an RLP-encoded header; the hash is keccak256 over the exact input.
    pub fn decode(header_rlp: &[u8]) -> Result<Self, ProofError> {
        let rlp = Rlp::new(header_rlp);
        if !rlp.is_list() {
            return Err(ProofError::MalformedHeader("header is not a list"));
        }
        let info = rlp.payload_info()?;
        if info.header_len + info.value_len != header_rlp.len() {
            return Err(ProofError::MalformedHeader("trailing bytes after header"));
        }
        if rlp.item_count()? <= HEADER_TIMESTAMP_INDEX {
            return Err(ProofError::MalformedHeader("too few fields"));
        }

        let hash = B256::from(keccak256(header_rlp));
        if hash == B256::ZERO {
            return Err(ProofError::MalformedHeader("zero block hash"));
        }

        Ok(Self {
            hash,
            parent_hash: hash_field(&rlp, 0)?,
            state_root: hash_field(&rlp, HEADER_STATE_ROOT_INDEX)?,
            number: rlp.val_at(HEADER_NUMBER_INDEX)?,
            timestamp: rlp.val_at(HEADER_TIMESTAMP_INDEX)?,
        })
    }
}

fn hash_field(rlp: &Rlp<'_>, index: usize) -> Result<B256, ProofError> {
    let data = rlp.at(index)?.data()?;
    if data.len() != 32 {
        return Err(ProofError::MalformedHeader("hash field is not 32 bytes"));
    }
    Ok(B256::from_slice(data))
}

impl Account {
    /// Decode the `[nonce, balance, storage_root, code_hash]` account leaf.
    pub fn decode(leaf: &[u8]) -> Result<Self, ProofError> {
        let rlp = Rlp::new(leaf);
        if !rlp.is_list() || rlp.item_count()? != 4 {
            return Err(ProofError::MalformedAccount("expected a 4-item list"));
        }

        let balance = rlp.at(1)?.data()?;
        let storage_root = rlp.at(2)?.data()?;
        let code_hash = rlp.at(3)?.data()?;
        if storage_root.len() != 32 || code_hash.len() != 32 {
            return Err(ProofError::MalformedAccount("root or code hash is not 32 bytes"));
        }

        Ok(Self {
            nonce: rlp.val_at(0)?,
            balance: U256::try_from_be_slice(balance)
                .ok_or(ProofError::MalformedAccount("balance wider than 256 bits"))?,
            storage_root: B256::from_slice(storage_root),
            code_hash: B256::from_slice(code_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{encode_account, encode_header, HeaderFields};

    #[test]
    fn test_decode_header_fields() {
        let fields = HeaderFields {
            parent_hash: B256::repeat_byte(0x11),
            state_root: B256::repeat_byte(0x22),
            number: 19_000_000,
            timestamp: 1_700_000_000,
        };
        let header_rlp = encode_header(&fields);

        let header = BlockHeader::decode(&header_rlp).unwrap();
        assert_eq!(header.hash, B256::from(keccak256(&header_rlp)));
        assert_eq!(header.parent_hash, fields.parent_hash);
        assert_eq!(header.state_root, fields.state_root);
        assert_eq!(header.number, 19_000_000);
        assert_eq!(header.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_decode_header_rejects_short_list() {
        let mut stream = rlp::RlpStream::new_list(4);
        for _ in 0..4 {
            stream.append(&B256::ZERO.to_vec());
        }
        assert!(matches!(
            BlockHeader::decode(&stream.out()),
            Err(ProofError::MalformedHeader("too few fields"))
        ));
    }

    #[test]
    fn test_decode_header_rejects_trailing_bytes() {
        let mut header_rlp = encode_header(&HeaderFields {
            parent_hash: B256::ZERO,
            state_root: B256::ZERO,
            number: 1,
            timestamp: 1,
        });
        header_rlp.push(0x01);
        assert!(BlockHeader::decode(&header_rlp).is_err());
    }

    #[test]
    fn test_account_round_trip() {
        let account = Account {
            nonce: 7,
            balance: U256::from(123_456_789u64),
            storage_root: B256::repeat_byte(0xab),
            code_hash: B256::repeat_byte(0xcd),
        };
        assert_eq!(Account::decode(&encode_account(&account)).unwrap(), account);
    }

    #[test]
    fn test_account_rejects_short_root() {
        let mut stream = rlp::RlpStream::new_list(4);
        stream.append(&1u64);
        stream.append(&0u64);
        stream.append(&vec![0xabu8; 31]);
        stream.append(&vec![0xcdu8; 32]);
        assert!(matches!(
            Account::decode(&stream.out()),
            Err(ProofError::MalformedAccount(_))
        ));
    }
}
