//! BondGold Issuance Protocol
//!
//! Mints BondGold tokens against bond collateral held in the
//! [`CollateralRegistry`](bondgold_collateral_registry::CollateralRegistry),
//! burns them to release that collateral, and redeems them 1:1 for gold
//! settled off-ledger.
//!
//! ## Core Operations
//!
//! - **Mint**: Consume the caller's bond collateral, mint the same amount
//! - **Burn**: Burn tokens, release collateral back to the bond owner
//! - **Redeem**: Burn tokens for gold; no collateral moves
//!
//! Each operation also pushes a reserve snapshot to the
//! [`PriceOracleCache`](bondgold_price_oracle::PriceOracleCache) as this
//! protocol's identity, which must therefore be a registered price source.
//!
//! ## Example
//!
//! ```ignore
//! let mut ctx = IssuanceContext::new(&mut registry, &mut oracle, &mut state, call);
//! let receipt = ctx.mint(500, "US912828ZQ6")?;
//! assert_eq!(receipt.balance_after, 500);
//! ```

pub mod ledger;
pub mod protocol;
pub mod state;

pub use ledger::TokenLedger;
pub use protocol::{execute, IssuanceContext, IssuancePhase, IssuanceReceipt};
pub use state::IssuanceState;
