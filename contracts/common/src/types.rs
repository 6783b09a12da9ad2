//! Core Types for the BondGold Protocol
//!
//! Data structures shared by the price oracle, the collateral registry
//! and the issuance protocol.

use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::oracle;
use crate::errors::{BondGoldError, BondGoldResult};

/// Type alias for identities (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for bond identifiers
pub type BondId = String;

/// Seconds on the execution environment's clock
pub type Timestamp = u64;

/// The all-zero identity, never a valid caller
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// First four bytes of an address as lowercase hex, for logs and errors
pub fn short_hex(address: &Address) -> String {
    address[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Full address as lowercase hex
pub fn address_to_hex(address: &Address) -> String {
    address.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a 64-character hex string (optional `0x` prefix) into an address
pub fn address_from_hex(input: &str) -> Option<Address> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() != 64 || !digits.is_ascii() {
        return None;
    }

    let mut address = [0u8; 32];
    for (i, byte) in address.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(address)
}

// ============ Call Context ============

/// Who is calling and when
///
/// The clock is supplied by the execution environment and must be
/// monotonically increasing across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Caller identity
    pub caller: Address,
    /// Current time in seconds
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Returns true if `timestamp` is no older than `window` at `now` (inclusive)
pub fn is_within_window(timestamp: Timestamp, now: Timestamp, window: u64) -> bool {
    now.saturating_sub(timestamp) <= window
}

// ============ Collateral Types ============

/// A tracked unit of deposited bond collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct BondPosition {
    /// Unique bond identifier
    pub id: BondId,
    /// Amount currently deposited across all holders
    pub amount: u64,
    /// Cumulative valuation credited on deposit
    pub valuation: u64,
    /// Time of the last verification
    pub last_verified: Timestamp,
    /// Whether the position may be operated on
    pub is_valid: bool,
    /// First depositor, exclusive for the lifetime of the position
    pub owner: Address,
    /// External listing reference
    pub listing_ref: String,
}

impl BondPosition {
    /// Creates a freshly verified, empty position
    pub fn new(id: BondId, owner: Address, listing_ref: String, now: Timestamp) -> Self {
        Self {
            id,
            amount: 0,
            valuation: 0,
            last_verified: now,
            is_valid: true,
            owner,
            listing_ref,
        }
    }

    /// Returns true if `caller` owns this position
    pub fn is_owned_by(&self, caller: &Address) -> bool {
        self.owner == *caller
    }

    /// Returns true if the last verification is no older than `window`
    pub fn is_verification_fresh(&self, now: Timestamp, window: u64) -> bool {
        is_within_window(self.last_verified, now, window)
    }
}

/// Registry-wide totals, maintained incrementally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct GlobalCounters {
    /// Total bond value deposited
    pub total_bond_value: u64,
    /// Total gold-equivalent value backing the bonds
    pub total_gold_value: u64,
}

impl GlobalCounters {
    /// Credit both counters (1:1 backing); neither moves on overflow
    ///
    /// # Errors
    /// - `Overflow` if either counter would exceed u64
    pub fn credit(&mut self, amount: u64) -> BondGoldResult<()> {
        let bond = self.total_bond_value.checked_add(amount).ok_or(BondGoldError::Overflow)?;
        let gold = self.total_gold_value.checked_add(amount).ok_or(BondGoldError::Overflow)?;
        self.total_bond_value = bond;
        self.total_gold_value = gold;
        Ok(())
    }

    /// Debit both counters, floored at zero
    pub fn debit(&mut self, amount: u64) {
        self.total_bond_value = self.total_bond_value.saturating_sub(amount);
        self.total_gold_value = self.total_gold_value.saturating_sub(amount);
    }
}

// ============ Oracle Types ============

/// Key of a cached price quote
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AssetKey {
    /// Spot gold
    Gold,
    /// A specific bond
    Bond(BondId),
}

impl AssetKey {
    pub fn bond(id: impl Into<BondId>) -> Self {
        Self::Bond(id.into())
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gold => f.write_str(oracle::GOLD_ASSET),
            Self::Bond(id) => write!(f, "BOND:{}", id),
        }
    }
}

/// Latest quote for an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceQuote {
    /// Quoted asset
    pub asset: AssetKey,
    /// Price with 8 decimal places
    pub price: u64,
    /// Confidence level (0-100)
    pub confidence: u8,
    /// Time of the update
    pub timestamp: Timestamp,
    /// Source label
    pub source: String,
}

impl PriceQuote {
    /// Returns true if the quote is no older than `window`
    pub fn is_fresh(&self, now: Timestamp, window: u64) -> bool {
        is_within_window(self.timestamp, now, window)
    }
}

/// Result of a price read: (price, timestamp, isValid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    pub price: u64,
    pub timestamp: Timestamp,
    pub is_valid: bool,
}

/// The single current reserve snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ReserveSnapshot {
    /// Total reserves backing the supply
    pub total_reserves: u64,
    /// Gold-equivalent value
    pub gold_value: u64,
    /// Bond value
    pub bond_value: u64,
    /// Time of the last write
    pub timestamp: Timestamp,
    /// False until the first write
    pub is_valid: bool,
}

/// Read-only attestation of the current reserve snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfReserves {
    pub total_reserves: u64,
    pub gold_value: u64,
    pub timestamp: Timestamp,
    /// SHA-256 over the snapshot fields
    pub digest: [u8; 32],
}

/// Where the registry ratio sits relative to the target band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    /// Below the minimum ratio
    Undercollateralized,
    /// Within [minimum, maximum]
    Compliant,
    /// Above the maximum ratio
    OverCollateralized,
}

// ============ Action Types ============

/// Issuance operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum IssuanceAction {
    /// Mint tokens against deposited bond collateral
    Mint { amount: u64, bond_id: BondId },
    /// Burn tokens and release bond collateral
    Burn { amount: u64, bond_id: BondId },
    /// Burn tokens against physical gold settlement
    Redeem { amount: u64 },
}

impl IssuanceAction {
    /// Operation name used by the reentrancy guard and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Burn { .. } => "burn",
            Self::Redeem { .. } => "redeem",
        }
    }
}
