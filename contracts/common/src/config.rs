//! Protocol Configuration
//!
//! Identities and thresholds consumed by the stores. Thresholds default
//! to the values in [`crate::constants`]; a deployment provides at least
//! the admin and issuance-protocol identities.
//!
//! ```json
//! {
//!   "admin": "0101010101010101010101010101010101010101010101010101010101010101",
//!   "issuance_protocol": "0202020202020202020202020202020202020202020202020202020202020202",
//!   "snapshot_policy": "atomic"
//! }
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{oracle, ratios, verification};
use crate::errors::{BondGoldError, BondGoldResult};
use crate::types::{Address, ZERO_ADDRESS};

/// How the issuance protocol treats the reserve snapshot push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// The push is validated up front; an operation either commits
    /// everything, snapshot included, or nothing
    #[default]
    Atomic,
    /// The push runs after the token mutation and a failure is logged
    /// and reported without rolling back
    BestEffort,
}

/// Which ratio a withdrawal is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioCheck {
    /// The ratio before the mutation
    #[default]
    PreState,
    /// The ratio before and the ratio the mutation would leave behind
    PostState,
}

/// Identities and thresholds for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Admin identity (sources, access lists, bond lifecycle)
    #[serde(with = "hex_address")]
    pub admin: Address,
    /// Issuance protocol identity (consume/release, reserve snapshot writes)
    #[serde(with = "hex_address")]
    pub issuance_protocol: Address,
    /// Minimum reserve ratio (percent)
    pub min_reserve_ratio: u64,
    /// Top of the compliance band (percent), never enforced
    pub max_reserve_ratio: u64,
    /// Maximum quote age (seconds)
    pub price_validity_secs: u64,
    /// Maximum bond verification age (seconds)
    pub verification_validity_secs: u64,
    /// Minimum quote confidence (0-100)
    pub min_confidence: u8,
    pub snapshot_policy: SnapshotPolicy,
    pub ratio_check: RatioCheck,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            admin: ZERO_ADDRESS,
            issuance_protocol: ZERO_ADDRESS,
            min_reserve_ratio: ratios::MINIMUM_RESERVE_RATIO,
            max_reserve_ratio: ratios::MAXIMUM_RESERVE_RATIO,
            price_validity_secs: oracle::PRICE_VALIDITY_SECS,
            verification_validity_secs: verification::VERIFICATION_VALIDITY_SECS,
            min_confidence: oracle::MIN_CONFIDENCE,
            snapshot_policy: SnapshotPolicy::default(),
            ratio_check: RatioCheck::default(),
        }
    }
}

impl ProtocolConfig {
    /// Default thresholds with the given identities
    pub fn new(admin: Address, issuance_protocol: Address) -> Self {
        Self {
            admin,
            issuance_protocol,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(input: &str) -> BondGoldResult<Self> {
        let config: Self = serde_json::from_str(input).map_err(|e| BondGoldError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the stores cannot operate under
    pub fn validate(&self) -> BondGoldResult<()> {
        let invalid = |reason: &str| {
            Err(BondGoldError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.admin == ZERO_ADDRESS {
            return invalid("admin cannot be zero address");
        }
        if self.issuance_protocol == ZERO_ADDRESS {
            return invalid("issuance_protocol cannot be zero address");
        }
        if self.min_reserve_ratio == 0 {
            return invalid("min_reserve_ratio must be positive");
        }
        if self.min_reserve_ratio > self.max_reserve_ratio {
            return invalid("min_reserve_ratio exceeds max_reserve_ratio");
        }
        if self.price_validity_secs == 0 || self.verification_validity_secs == 0 {
            return invalid("validity windows must be positive");
        }
        if self.min_confidence > oracle::MAX_CONFIDENCE {
            return invalid("min_confidence above 100");
        }
        Ok(())
    }
}

/// Addresses as 64-character hex strings
mod hex_address {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::{address_from_hex, address_to_hex, Address};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address_to_hex(address))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        address_from_hex(&raw).ok_or_else(|| D::Error::custom("expected a 32-byte hex address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";
    const ISSUER_HEX: &str = "0202020202020202020202020202020202020202020202020202020202020202";

    #[test]
    fn test_from_json_uses_defaults() {
        let json = format!(r#"{{"admin": "{}", "issuance_protocol": "{}"}}"#, ADMIN_HEX, ISSUER_HEX);
        let config = ProtocolConfig::from_json(&json).unwrap();

        assert_eq!(config.admin, [1u8; 32]);
        assert_eq!(config.issuance_protocol, [2u8; 32]);
        assert_eq!(config.min_reserve_ratio, 100);
        assert_eq!(config.max_reserve_ratio, 120);
        assert_eq!(config.price_validity_secs, 3_600);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::Atomic);
        assert_eq!(config.ratio_check, RatioCheck::PreState);
    }

    #[test]
    fn test_from_json_overrides() {
        let json = format!(
            r#"{{"admin": "0x{}", "issuance_protocol": "{}", "snapshot_policy": "best_effort", "ratio_check": "post_state", "min_confidence": 90}}"#,
            ADMIN_HEX, ISSUER_HEX
        );
        let config = ProtocolConfig::from_json(&json).unwrap();

        assert_eq!(config.snapshot_policy, SnapshotPolicy::BestEffort);
        assert_eq!(config.ratio_check, RatioCheck::PostState);
        assert_eq!(config.min_confidence, 90);
    }

    #[test]
    fn test_from_json_rejects_missing_identities() {
        let result = ProtocolConfig::from_json("{}");
        assert!(matches!(result, Err(BondGoldError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_json_rejects_bad_hex() {
        let result = ProtocolConfig::from_json(r#"{"admin": "nope"}"#);
        assert!(matches!(result, Err(BondGoldError::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_ratio_band() {
        let mut config = ProtocolConfig::new([1u8; 32], [2u8; 32]);
        assert!(config.validate().is_ok());

        config.min_reserve_ratio = 130;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ProtocolConfig::new([7u8; 32], [8u8; 32]);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ProtocolConfig::from_json(&json).unwrap(), config);
    }
}
