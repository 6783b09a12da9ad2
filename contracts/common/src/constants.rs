//! Protocol Constants
//!
//! All thresholds and configuration defaults for the BondGold protocol.
//! `ProtocolConfig::default()` is built from these values; deployments
//! that need different thresholds override them through the config.

/// Token Metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "BondGold";
    /// Token symbol
    pub const SYMBOL: &str = "BGLD";
    /// Decimal places
    pub const DECIMALS: u8 = 8;
}

/// Reserve Ratios (in percentage points, e.g., 100 = 100%)
pub mod ratios {
    /// Minimum reserve ratio - every mutating path is blocked below this
    pub const MINIMUM_RESERVE_RATIO: u64 = 100;

    /// Upper bound of the target band, only reported by the compliance read path
    pub const MAXIMUM_RESERVE_RATIO: u64 = 120;

    /// Percentage multiplier used by the ratio formula
    pub const PERCENT: u64 = 100;
}

/// Oracle Configuration
pub mod oracle {
    /// Maximum age of a price quote (seconds)
    pub const PRICE_VALIDITY_SECS: u64 = 60 * 60;

    /// Minimum confidence a quote must carry to be accepted (0-100)
    pub const MIN_CONFIDENCE: u8 = 80;

    /// Highest representable confidence
    pub const MAX_CONFIDENCE: u8 = 100;

    /// Asset label used for the gold quote in events
    pub const GOLD_ASSET: &str = "GOLD";
}

/// Bond Verification
pub mod verification {
    /// Maximum age of a bond verification (seconds, 7 days)
    pub const VERIFICATION_VALIDITY_SECS: u64 = 7 * 24 * 60 * 60;
}

/// Redemption
pub mod redemption {
    /// Bond reference carried by burn notifications for gold redemptions
    pub const GOLD_REDEMPTION_REF: &str = "GOLD_REDEMPTION";
}

/// Precision Constants
pub mod precision {
    /// Price precision (8 decimals): a price of `PRICE_PRECISION` values one
    /// base unit of collateral at one base unit of reserves
    pub const PRICE_PRECISION: u64 = 100_000_000;
}

/// Input Limits
pub mod limits {
    /// Longest accepted bond identifier
    pub const MAX_BOND_ID_LEN: usize = 64;

    /// Longest accepted listing reference or source label
    pub const MAX_LABEL_LEN: usize = 128;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_band_is_ordered() {
        assert!(ratios::MINIMUM_RESERVE_RATIO <= ratios::MAXIMUM_RESERVE_RATIO);
    }

    #[test]
    fn test_windows() {
        assert_eq!(oracle::PRICE_VALIDITY_SECS, 3_600);
        assert_eq!(verification::VERIFICATION_VALIDITY_SECS, 604_800);
        assert!(oracle::MIN_CONFIDENCE <= oracle::MAX_CONFIDENCE);
    }
}
