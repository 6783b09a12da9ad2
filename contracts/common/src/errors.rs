//! Error Types for the BondGold Protocol
//!
//! Typed errors carrying enough context to explain a rejected operation.
//! Every validation failure aborts the whole operation, so an error
//! returned from a store means that store is unchanged.

use thiserror::Error;

use crate::types::{short_hex, Address};

/// Result type alias for BondGold operations
pub type BondGoldResult<T> = Result<T, BondGoldError>;

/// Main error enum for all BondGold protocol errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BondGoldError {
    // ============ Input Errors ============
    /// Malformed, zero or empty input
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument {
        param: &'static str,
        reason: &'static str,
    },

    // ============ Authorization Errors ============
    /// Wrong identity for a privileged call
    #[error("unauthorized: expected {}, got {}", short_hex(.expected), short_hex(.actual))]
    Unauthorized { expected: Address, actual: Address },

    /// Only the protocol admin can perform this action
    #[error("only the admin can perform this action")]
    AdminOnly,

    /// Caller is not a registered price source
    #[error("{} is not an authorized price source", short_hex(.caller))]
    UnauthorizedSource { caller: Address },

    /// Caller does not own the bond position
    #[error("caller does not own bond `{bond_id}`")]
    NotOwner { bond_id: String },

    /// Caller is not on the mint allow-list
    #[error("{} is not whitelisted", short_hex(.account))]
    NotWhitelisted { account: Address },

    /// Caller is on the deny-list
    #[error("{} is blacklisted", short_hex(.account))]
    Blacklisted { account: Address },

    // ============ Position Errors ============
    /// Bond position missing or invalidated
    #[error("bond `{bond_id}` is missing or invalid")]
    InvalidPosition { bond_id: String },

    // ============ Amount Errors ============
    /// Holder balance (collateral or tokens) too small
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    /// Holder collateral too small to back a mint
    #[error("insufficient collateral: available {available}, requested {requested}")]
    InsufficientCollateral { available: u64, requested: u64 },

    /// Computed value rounds down to zero
    #[error("value of {amount} at price {price} rounds to zero")]
    ValueTooLow { amount: u64, price: u64 },

    // ============ Staleness Errors ============
    /// Price quote is older than the validity window
    #[error("price for {asset} expired: quoted at {timestamp}, now {now}")]
    PriceExpired {
        asset: String,
        timestamp: u64,
        now: u64,
    },

    /// Bond verification is older than the validity window
    #[error("verification of bond `{bond_id}` expired: verified at {verified_at}, now {now}")]
    VerificationExpired {
        bond_id: String,
        verified_at: u64,
        now: u64,
    },

    // ============ Reserve Errors ============
    /// Reserve ratio below the minimum
    #[error("reserve ratio {current_ratio}% below required {required_ratio}%")]
    RatioViolation {
        current_ratio: u64,
        required_ratio: u64,
    },

    // ============ State Errors ============
    /// A guarded entry point was entered again before it completed
    #[error("reentrant call into `{operation}`")]
    Reentrancy { operation: &'static str },

    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Configuration rejected by validation
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Persisted state could not be encoded or decoded
    #[error("codec error: {reason}")]
    Codec { reason: String },
}

impl BondGoldError {
    /// Returns a stable error code for logging and indexing
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "E001_INVALID_ARGUMENT",
            Self::Unauthorized { .. } => "E010_UNAUTHORIZED",
            Self::AdminOnly => "E011_ADMIN_ONLY",
            Self::UnauthorizedSource { .. } => "E012_UNAUTHORIZED_SOURCE",
            Self::NotOwner { .. } => "E013_NOT_OWNER",
            Self::NotWhitelisted { .. } => "E014_NOT_WHITELISTED",
            Self::Blacklisted { .. } => "E015_BLACKLISTED",
            Self::InvalidPosition { .. } => "E020_INVALID_POSITION",
            Self::InsufficientBalance { .. } => "E030_INSUFFICIENT_BALANCE",
            Self::InsufficientCollateral { .. } => "E031_INSUFFICIENT_COLLATERAL",
            Self::ValueTooLow { .. } => "E032_VALUE_TOO_LOW",
            Self::PriceExpired { .. } => "E040_PRICE_EXPIRED",
            Self::VerificationExpired { .. } => "E041_VERIFICATION_EXPIRED",
            Self::RatioViolation { .. } => "E050_RATIO_VIOLATION",
            Self::Reentrancy { .. } => "E060_REENTRANCY",
            Self::Overflow => "E061_OVERFLOW",
            Self::InvalidConfig { .. } => "E070_INVALID_CONFIG",
            Self::Codec { .. } => "E071_CODEC",
        }
    }

    /// Returns true if the caller can fix this by topping up or waiting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientCollateral { .. }
                | Self::PriceExpired { .. }  // Wait for a fresh quote
                | Self::VerificationExpired { .. }
                | Self::RatioViolation { .. }
        )
    }

    /// Shorthand for the common empty-input rejection
    pub fn empty(param: &'static str) -> Self {
        Self::InvalidArgument {
            param,
            reason: "must not be empty",
        }
    }

    /// Shorthand for the common zero-amount rejection
    pub fn zero(param: &'static str) -> Self {
        Self::InvalidArgument {
            param,
            reason: "must be greater than zero",
        }
    }
}

impl From<std::io::Error> for BondGoldError {
    fn from(err: std::io::Error) -> Self {
        Self::Codec {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            BondGoldError::empty("bond_id"),
            BondGoldError::Unauthorized {
                expected: [1u8; 32],
                actual: [2u8; 32],
            },
            BondGoldError::AdminOnly,
            BondGoldError::UnauthorizedSource { caller: [3u8; 32] },
            BondGoldError::NotOwner { bond_id: "B".into() },
            BondGoldError::NotWhitelisted { account: [0u8; 32] },
            BondGoldError::Blacklisted { account: [0u8; 32] },
            BondGoldError::InvalidPosition { bond_id: "B".into() },
            BondGoldError::InsufficientBalance { available: 1, requested: 2 },
            BondGoldError::InsufficientCollateral { available: 1, requested: 2 },
            BondGoldError::ValueTooLow { amount: 1, price: 1 },
            BondGoldError::PriceExpired { asset: "GOLD".into(), timestamp: 0, now: 1 },
            BondGoldError::VerificationExpired { bond_id: "B".into(), verified_at: 0, now: 1 },
            BondGoldError::RatioViolation { current_ratio: 99, required_ratio: 100 },
            BondGoldError::Reentrancy { operation: "mint" },
            BondGoldError::Overflow,
            BondGoldError::InvalidConfig { reason: "x".into() },
            BondGoldError::Codec { reason: "x".into() },
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_display_includes_context() {
        let err = BondGoldError::RatioViolation {
            current_ratio: 95,
            required_ratio: 100,
        };
        assert_eq!(err.to_string(), "reserve ratio 95% below required 100%");

        let err = BondGoldError::Unauthorized {
            expected: [0xab; 32],
            actual: [0x01; 32],
        };
        assert_eq!(err.to_string(), "unauthorized: expected abababab, got 01010101");
    }

    #[test]
    fn test_recoverable() {
        assert!(BondGoldError::InsufficientBalance { available: 0, requested: 1 }.is_recoverable());
        assert!(!BondGoldError::AdminOnly.is_recoverable());
    }
}
