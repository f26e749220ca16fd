//! Storage layout of the vault whose parameters are proven.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolValue;

use crate::rlp_encoding::keccak256;
use crate::types::PARAM_COUNT;

pub const TOTAL_DEBT_SLOT: u64 = 21;
pub const TOTAL_IDLE_SLOT: u64 = 22;
pub const TOTAL_SUPPLY_SLOT: u64 = 20;
pub const FULL_PROFIT_UNLOCK_DATE_SLOT: u64 = 38;
pub const PROFIT_UNLOCKING_RATE_SLOT: u64 = 39;
pub const LAST_PROFIT_UPDATE_SLOT: u64 = 40;
/// Base slot of the `balance_of` mapping
pub const BALANCE_OF_SLOT: u64 = 18;
pub const PROFIT_MAX_UNLOCK_TIME_SLOT: u64 = 37;

/// Slot of `mapping[key]` for a mapping rooted at `base`.
pub fn mapping_slot(base: u64, key: Address) -> U256 {
    let encoded = (U256::from(base), key).abi_encode();
    U256::from_be_bytes(keccak256(&encoded))
}

/// Slots backing a price update, in snapshot order.
pub fn price_param_slots(vault: Address) -> [U256; PARAM_COUNT] {
    [
        U256::from(TOTAL_DEBT_SLOT),
        U256::from(TOTAL_IDLE_SLOT),
        U256::from(TOTAL_SUPPLY_SLOT),
        U256::from(FULL_PROFIT_UNLOCK_DATE_SLOT),
        U256::from(PROFIT_UNLOCKING_RATE_SLOT),
        U256::from(LAST_PROFIT_UPDATE_SLOT),
        mapping_slot(BALANCE_OF_SLOT, vault),
    ]
}

/// Slots backing a profit-unlock-period update.
pub fn period_slots() -> [U256; 1] {
    [U256::from(PROFIT_MAX_UNLOCK_TIME_SLOT)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_mapping_slot_is_keccak_of_padded_pair() {
        let vault = address!("0655977feb2f289a4ab78af67bab0d17aab84367");

        let mut preimage = [0u8; 64];
        preimage[31] = 18;
        preimage[44..].copy_from_slice(vault.as_slice());

        assert_eq!(
            mapping_slot(BALANCE_OF_SLOT, vault),
            U256::from_be_bytes(keccak256(&preimage))
        );
    }

    #[test]
    fn test_price_param_slots_order() {
        let slots = price_param_slots(Address::ZERO);
        assert_eq!(slots[..6], [21u64, 22, 20, 38, 39, 40].map(U256::from));
    }
}
