//! ABI encodings of the proven updates, for relaying them to an oracle
//! contract on the destination chain.

use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};

use crate::types::VaultSnapshot;

sol! {
    /// Update surface of the destination-chain price oracle.
    interface IVaultPriceOracle {
        function update_price(uint256[7] parameters, uint256 ts, uint256 block_number) external returns (uint256);
        function update_profit_max_unlock_time(uint256 profit_max_unlock_time, uint256 block_number) external returns (bool);
    }
}

pub use IVaultPriceOracle::{update_priceCall, update_profit_max_unlock_timeCall};

pub fn update_price_calldata(snapshot: &VaultSnapshot, ts: u64, block_number: u64) -> Vec<u8> {
    update_priceCall {
        parameters: snapshot.to_array(),
        ts: U256::from(ts),
        block_number: U256::from(block_number),
    }
    .abi_encode()
}

pub fn update_profit_max_unlock_time_calldata(profit_max_unlock_time: u64, block_number: u64) -> Vec<u8> {
    update_profit_max_unlock_timeCall {
        profit_max_unlock_time: U256::from(profit_max_unlock_time),
        block_number: U256::from(block_number),
    }
    .abi_encode()
}
