use alloy_primitives::U256;
use rlp::Rlp;
use sha3::{Digest, Keccak256};

use crate::error::RlpError;
use crate::types::H256;

/// Compute Keccak256 hash
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a byte string using RLP
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        // Single byte less than 128: encode as itself
        data.to_vec()
    } else if data.len() < 56 {
        let mut encoded = vec![0x80 + data.len() as u8];
        encoded.extend_from_slice(data);
        encoded
    } else {
        let len_bytes = length_to_bytes(data.len());
        let mut encoded = vec![0xb7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(data);
        encoded
    }
}

/// Encode a list of already-encoded items using RLP
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();

    if payload.len() < 56 {
        let mut encoded = vec![0xc0 + payload.len() as u8];
        encoded.extend_from_slice(&payload);
        encoded
    } else {
        let len_bytes = length_to_bytes(payload.len());
        let mut encoded = vec![0xf7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(&payload);
        encoded
    }
}

/// Encode an unsigned integer the way storage slots hold it: big-endian,
/// no leading zeros.
pub fn encode_uint(value: U256) -> Vec<u8> {
    let bytes = value.to_be_bytes::<32>();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    encode_bytes(&bytes[first..])
}

/// Convert length to big-endian bytes
fn length_to_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Whether the encoded item is a list
pub fn is_list(data: &[u8]) -> bool {
    data.first().is_some_and(|p| *p >= 0xc0)
}

/// The whole input as one item; anything after it is rejected.
fn single_item(data: &[u8]) -> Result<Rlp<'_>, RlpError> {
    if data.is_empty() {
        return Err(RlpError::Empty);
    }
    let rlp = Rlp::new(data);
    let info = rlp.payload_info()?;
    let end = info.header_len + info.value_len;
    if data.len() > end {
        return Err(RlpError::TrailingBytes(data.len() - end));
    }
    Ok(rlp)
}

/// Split an RLP list into its items, each kept in its encoded form.
///
/// The list must span the whole input.
pub fn decode_list(data: &[u8]) -> Result<Vec<Vec<u8>>, RlpError> {
    let rlp = single_item(data)?;
    if !rlp.is_list() {
        return Err(RlpError::NotAList);
    }

    // `Rlp::iter` stops quietly at a malformed item, so walk by index until
    // the payload is used up
    let payload_len = rlp.payload_info()?.value_len;
    let mut items = Vec::new();
    let mut consumed = 0;
    while consumed < payload_len {
        let item = rlp.at(items.len())?;
        consumed += item.as_raw().len();
        items.push(item.as_raw().to_vec());
    }
    Ok(items)
}

/// Decode a single RLP-encoded byte string
pub fn decode_bytes(data: &[u8]) -> Result<Vec<u8>, RlpError> {
    let rlp = single_item(data)?;
    if rlp.is_list() {
        return Err(RlpError::NotBytes);
    }
    Ok(rlp.data()?.to_vec())
}
