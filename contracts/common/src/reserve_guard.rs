//! Reserve Ratio Guard
//!
//! Pure comparison of a reserve ratio against the protocol thresholds.
//! Every mutating path that can reduce backing calls [`check_minimum`];
//! the maximum ratio is only reported by [`compliance_status`] and never
//! blocks a mutation.

use crate::errors::{BondGoldError, BondGoldResult};
use crate::types::ComplianceStatus;

/// Returns true if `ratio` meets the minimum (inclusive)
pub fn meets_minimum(ratio: u64, minimum: u64) -> bool {
    ratio >= minimum
}

/// Reject a ratio below the minimum
///
/// # Errors
/// - `RatioViolation` carrying both the observed and the required ratio
pub fn check_minimum(ratio: u64, minimum: u64) -> BondGoldResult<()> {
    if !meets_minimum(ratio, minimum) {
        tracing::debug!(ratio, minimum, "reserve ratio below minimum");
        return Err(BondGoldError::RatioViolation {
            current_ratio: ratio,
            required_ratio: minimum,
        });
    }
    Ok(())
}

/// Classify a ratio against the [minimum, maximum] target band
pub fn compliance_status(ratio: u64, minimum: u64, maximum: u64) -> ComplianceStatus {
    if ratio < minimum {
        ComplianceStatus::Undercollateralized
    } else if ratio > maximum {
        ComplianceStatus::OverCollateralized
    } else {
        ComplianceStatus::Compliant
    }
}
