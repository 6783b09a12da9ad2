//! BondGold Common Library
//!
//! Shared types, constants, and utilities for the BondGold stores.
//!
//! BondGold issues a token whose supply is backed by deposited bond
//! positions. Three stores hold all state:
//!
//! - **PriceOracleCache** (`bondgold-price-oracle`): latest quote per asset
//!   and the current reserve snapshot
//! - **CollateralRegistry** (`bondgold-collateral-registry`): bond positions,
//!   holder balances and global counters
//! - **IssuanceState** (`bondgold-issuance`): token ledger and running
//!   reserve counters, mutated by mint/burn/redeem
//!
//! This crate provides what those stores share:
//!
//! - **Reserve Ratio Guard**: the minimum-ratio check every mutating path runs
//! - **Capabilities**: explicit identity proofs for privileged entry points
//! - **Reentrancy Guard**: per-store re-entry flag
//! - **Events**: typed notifications for off-chain observers
//! - **Config**: identities and thresholds, loadable from JSON

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod reserve_guard;
pub mod reentrancy;
pub mod access_control;
pub mod config;

// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use events::*;
pub use access_control::{AccessList, Capability, Role};
pub use config::{ProtocolConfig, RatioCheck, SnapshotPolicy};
pub use reentrancy::ReentrancyGuard;
