use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};

/// Fixed-point unit of every price (1e18).
pub const PRICE_UNIT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Scale of `profit_unlocking_rate` in the vault.
pub const MAX_BPS_EXTENDED: U256 = U256::from_limbs([1_000_000_000_000, 0, 0, 0]);

pub const DEFAULT_MAX_PRICE_INCREMENT: u64 = 2_000_000_000_000;
pub const MIN_MAX_PRICE_INCREMENT: u64 = 100_000_000;
pub const MAX_MAX_PRICE_INCREMENT: u64 = 1_000_000_000_000_000_000;

/// Half a year of weekly periods
pub const DEFAULT_MAX_V2_DURATION: u32 = 4 * 6;
/// Four years of weekly periods
pub const MAX_V2_DURATION: u32 = 4 * 12 * 4;

pub const DEFAULT_PROFIT_MAX_UNLOCK_TIME: u64 = 7 * 86_400;

/// Tunables of a [`PriceOracle`](crate::oracle::PriceOracle).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Price reported before the first proven snapshot
    pub initial_price: U256,
    /// Max relative increase per second, parts per 1e18
    pub max_price_increment: U256,
    /// Cap on extrapolated reward periods in the v2 model
    pub max_v2_duration: u32,
    /// Reward period assumed until one is proven, seconds
    pub profit_max_unlock_time: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            initial_price: PRICE_UNIT,
            max_price_increment: U256::from(DEFAULT_MAX_PRICE_INCREMENT),
            max_v2_duration: DEFAULT_MAX_V2_DURATION,
            profit_max_unlock_time: DEFAULT_PROFIT_MAX_UNLOCK_TIME,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> OracleResult<()> {
        if self.initial_price.is_zero() {
            return Err(OracleError::ConfigOutOfRange {
                name: "initial_price",
                value: self.initial_price,
                min: U256::from(1u64),
                max: U256::MAX,
            });
        }
        check_max_price_increment(self.max_price_increment)?;
        check_max_v2_duration(self.max_v2_duration)
    }
}

pub(crate) fn check_max_price_increment(value: U256) -> OracleResult<()> {
    let (min, max) = (U256::from(MIN_MAX_PRICE_INCREMENT), U256::from(MAX_MAX_PRICE_INCREMENT));
    if value < min || value > max {
        return Err(OracleError::ConfigOutOfRange {
            name: "max_price_increment",
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_max_v2_duration(value: u32) -> OracleResult<()> {
    if value > MAX_V2_DURATION {
        return Err(OracleError::ConfigOutOfRange {
            name: "max_v2_duration",
            value: U256::from(value),
            min: U256::ZERO,
            max: U256::from(MAX_V2_DURATION),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        OracleConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: OracleConfig = serde_json::from_str(r#"{"max_v2_duration": 12}"#).unwrap();
        assert_eq!(config.max_v2_duration, 12);
        assert_eq!(config.initial_price, PRICE_UNIT);
        assert_eq!(config.profit_max_unlock_time, 604_800);
    }

    #[test]
    fn test_bounds() {
        assert!(check_max_price_increment(U256::from(MIN_MAX_PRICE_INCREMENT - 1)).is_err());
        assert!(check_max_price_increment(U256::from(MAX_MAX_PRICE_INCREMENT) + U256::from(1u64)).is_err());
        assert!(check_max_v2_duration(MAX_V2_DURATION).is_ok());
        assert!(check_max_v2_duration(MAX_V2_DURATION + 1).is_err());

        let zero_price = OracleConfig {
            initial_price: U256::ZERO,
            ..OracleConfig::default()
        };
        assert!(matches!(
            zero_price.validate(),
            Err(OracleError::ConfigOutOfRange { name: "initial_price", .. })
        ));
    }
}
