//! Mint, burn and redeem
//!
//! Every operation runs as a two-phase transaction over the three stores:
//! all checks are evaluated first against the pre-operation state, then
//! the mutations are applied. A failed check leaves every store untouched.
//!
//! ```text
//! Idle -> Validating -> Committing -> Done
//!              |
//!              +-> Aborted
//! ```

use serde::{Deserialize, Serialize};

use bondgold_collateral_registry::CollateralRegistry;
use bondgold_common::{
    constants::{oracle as oracle_consts, redemption},
    errors::{BondGoldError, BondGoldResult},
    events::BondGoldEvent,
    math::{calculate_bond_value, floor_sub, safe_add},
    reserve_guard::check_minimum,
    types::{Address, AssetKey, CallContext, IssuanceAction},
    Role, SnapshotPolicy,
};
use bondgold_price_oracle::PriceOracleCache;

use crate::state::IssuanceState;

// ============ Context ============

/// Where a call currently is in its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssuancePhase {
    #[default]
    Idle,
    Validating,
    Committing,
    Done,
    Aborted,
}

/// Stores and caller for one issuance call
pub struct IssuanceContext<'a> {
    pub registry: &'a mut CollateralRegistry,
    pub oracle: &'a mut PriceOracleCache,
    pub state: &'a mut IssuanceState,
    /// Caller and current time
    pub call: CallContext,
    phase: IssuancePhase,
}

impl<'a> IssuanceContext<'a> {
    pub fn new(
        registry: &'a mut CollateralRegistry,
        oracle: &'a mut PriceOracleCache,
        state: &'a mut IssuanceState,
        call: CallContext,
    ) -> Self {
        Self {
            registry,
            oracle,
            state,
            call,
            phase: IssuancePhase::Idle,
        }
    }

    pub fn phase(&self) -> IssuancePhase {
        self.phase
    }

    /// Mint `amount` tokens against the caller's `bond_id` collateral
    pub fn mint(&mut self, amount: u64, bond_id: &str) -> BondGoldResult<IssuanceReceipt> {
        execute(
            self,
            &IssuanceAction::Mint {
                amount,
                bond_id: bond_id.to_string(),
            },
        )
    }

    /// Burn `amount` tokens and release `bond_id` collateral back to the caller
    pub fn burn(&mut self, amount: u64, bond_id: &str) -> BondGoldResult<IssuanceReceipt> {
        execute(
            self,
            &IssuanceAction::Burn {
                amount,
                bond_id: bond_id.to_string(),
            },
        )
    }

    /// Burn `amount` tokens for gold, settled off-ledger
    pub fn redeem(&mut self, amount: u64) -> BondGoldResult<IssuanceReceipt> {
        execute(self, &IssuanceAction::Redeem { amount })
    }
}

/// Outcome of a committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceReceipt {
    pub owner: Address,
    /// Tokens minted or burned
    pub amount: u64,
    /// Reserve value credited or debited
    pub value: u64,
    pub balance_after: u64,
    pub total_supply_after: u64,
    /// False only when a best-effort snapshot push failed
    pub snapshot_pushed: bool,
}

/// Reserve snapshot to push once the operation commits
#[derive(Debug, Clone, Copy)]
struct SnapshotUpdate {
    total_reserves: u64,
    gold_value: u64,
    bond_value: u64,
}

/// Checked values carried from validation into commit
#[derive(Debug, Clone, Copy)]
struct Plan {
    value: u64,
    total_reserves: u64,
    total_gold_value: u64,
    snapshot: SnapshotUpdate,
}

// ============ Dispatch ============

/// Main entry point for issuance operations
pub fn execute(ctx: &mut IssuanceContext<'_>, action: &IssuanceAction) -> BondGoldResult<IssuanceReceipt> {
    if let Err(err) = ctx.state.guard.enter(action.name()) {
        ctx.phase = IssuancePhase::Aborted;
        return Err(err);
    }
    ctx.phase = IssuancePhase::Validating;

    let result = match action {
        IssuanceAction::Mint { amount, bond_id } => mint(ctx, *amount, bond_id),
        IssuanceAction::Burn { amount, bond_id } => burn(ctx, *amount, bond_id),
        IssuanceAction::Redeem { amount } => redeem(ctx, *amount),
    };

    match &result {
        Ok(_) => ctx.phase = IssuancePhase::Done,
        Err(err) => {
            tracing::warn!(operation = action.name(), code = err.code(), %err, "issuance aborted");
            ctx.phase = IssuancePhase::Aborted;
        }
    }
    ctx.state.guard.exit();
    result
}

// ============ Mint ============

fn mint(ctx: &mut IssuanceContext<'_>, amount: u64, bond_id: &str) -> BondGoldResult<IssuanceReceipt> {
    let plan = validate_mint(ctx, amount, bond_id)?;
    ctx.phase = IssuancePhase::Committing;

    let owner = ctx.call.caller;
    let cap = ctx.state.capability();
    ctx.registry.consume_collateral(&cap, &owner, bond_id, amount)?;
    ctx.state.ledger.mint(&owner, amount)?;
    ctx.state.total_reserves = plan.total_reserves;
    ctx.state.total_gold_value = plan.total_gold_value;
    let snapshot_pushed = push_snapshot(ctx, plan.snapshot)?;

    tracing::info!(bond_id, amount, value = plan.value, "tokens minted");
    ctx.state.events.emit(BondGoldEvent::TokensMinted {
        owner,
        amount,
        bond_id: bond_id.to_string(),
    });
    Ok(receipt(ctx, amount, plan.value, snapshot_pushed))
}

fn validate_mint(ctx: &IssuanceContext<'_>, amount: u64, bond_id: &str) -> BondGoldResult<Plan> {
    let caller = ctx.call.caller;
    let now = ctx.call.now;

    // 1. Access lists
    ctx.state.access.check(&caller)?;

    // 2. Arguments
    if amount == 0 {
        return Err(BondGoldError::zero("amount"));
    }
    if bond_id.is_empty() {
        return Err(BondGoldError::empty("bond_id"));
    }

    // 3. Collateral held
    let available = ctx.registry.get_user_bond_balance(&caller, bond_id);
    if available < amount {
        return Err(BondGoldError::InsufficientCollateral {
            available,
            requested: amount,
        });
    }

    // 4. Valid, owned and recently verified position
    let position = ctx.registry.get_bond_info(bond_id).ok_or_else(|| BondGoldError::InvalidPosition {
        bond_id: bond_id.to_string(),
    })?;
    if !position.is_valid {
        return Err(BondGoldError::InvalidPosition {
            bond_id: bond_id.to_string(),
        });
    }
    if !position.is_owned_by(&caller) {
        return Err(BondGoldError::NotOwner {
            bond_id: bond_id.to_string(),
        });
    }
    if !position.is_verification_fresh(now, ctx.state.verification_validity_secs) {
        return Err(BondGoldError::VerificationExpired {
            bond_id: bond_id.to_string(),
            verified_at: position.last_verified,
            now,
        });
    }

    // 5. Bond value at a fresh price
    let value = bond_value(ctx, amount, bond_id)?;

    // 6. Reserve ratio before the operation
    check_minimum(ctx.registry.calculate_reserve_ratio(), ctx.state.min_reserve_ratio)?;

    // 7. Supply and reserves must not overflow
    if !ctx.state.ledger.can_mint(amount) {
        return Err(BondGoldError::Overflow);
    }
    let total_reserves = safe_add(ctx.state.total_reserves, value)?;
    let total_gold_value = safe_add(ctx.state.total_gold_value, value)?;

    // 8. Every commit step must be able to succeed
    require_commit_authority(ctx)?;

    let current = ctx.oracle.get_reserve_data();
    tracing::debug!(bond_id, amount, value, "mint validated");
    Ok(Plan {
        value,
        total_reserves,
        total_gold_value,
        snapshot: SnapshotUpdate {
            total_reserves: current.total_reserves.saturating_add(value),
            gold_value: current.gold_value,
            bond_value: current.bond_value.saturating_add(value),
        },
    })
}

// ============ Burn ============

fn burn(ctx: &mut IssuanceContext<'_>, amount: u64, bond_id: &str) -> BondGoldResult<IssuanceReceipt> {
    let plan = validate_burn(ctx, amount, bond_id)?;
    ctx.phase = IssuancePhase::Committing;

    let owner = ctx.call.caller;
    let cap = ctx.state.capability();
    ctx.state.ledger.burn(&owner, amount)?;
    ctx.registry.release_collateral(&cap, &owner, bond_id, amount)?;
    ctx.state.total_reserves = plan.total_reserves;
    ctx.state.total_gold_value = plan.total_gold_value;
    let snapshot_pushed = push_snapshot(ctx, plan.snapshot)?;

    tracing::info!(bond_id, amount, value = plan.value, "tokens burned");
    ctx.state.events.emit(BondGoldEvent::TokensBurned {
        owner,
        amount,
        bond_ref: bond_id.to_string(),
    });
    Ok(receipt(ctx, amount, plan.value, snapshot_pushed))
}

fn validate_burn(ctx: &IssuanceContext<'_>, amount: u64, bond_id: &str) -> BondGoldResult<Plan> {
    let caller = ctx.call.caller;

    // 1. Arguments
    if amount == 0 {
        return Err(BondGoldError::zero("amount"));
    }
    if bond_id.is_empty() {
        return Err(BondGoldError::empty("bond_id"));
    }

    // 2. Token balance
    let available = ctx.state.ledger.balance_of(&caller);
    if available < amount {
        return Err(BondGoldError::InsufficientBalance {
            available,
            requested: amount,
        });
    }

    // 3. Collateral goes back to the bond owner only
    let position = ctx.registry.get_bond_info(bond_id).ok_or_else(|| BondGoldError::InvalidPosition {
        bond_id: bond_id.to_string(),
    })?;
    if !position.is_valid {
        return Err(BondGoldError::InvalidPosition {
            bond_id: bond_id.to_string(),
        });
    }
    if !position.is_owned_by(&caller) {
        return Err(BondGoldError::NotOwner {
            bond_id: bond_id.to_string(),
        });
    }

    // 4. Bond value at a fresh price
    let value = bond_value(ctx, amount, bond_id)?;

    // 5. Reserve ratio before the operation
    check_minimum(ctx.registry.calculate_reserve_ratio(), ctx.state.min_reserve_ratio)?;

    // 6. Release must fit the registry counters and the holder balance
    let counters = ctx.registry.counters();
    safe_add(counters.total_bond_value, amount)?;
    safe_add(counters.total_gold_value, amount)?;
    safe_add(ctx.registry.get_user_bond_balance(&caller, bond_id), amount)?;

    // 7. Every commit step must be able to succeed
    require_commit_authority(ctx)?;

    let current = ctx.oracle.get_reserve_data();
    tracing::debug!(bond_id, amount, value, "burn validated");
    Ok(Plan {
        value,
        total_reserves: floor_sub(ctx.state.total_reserves, value),
        total_gold_value: floor_sub(ctx.state.total_gold_value, value),
        snapshot: SnapshotUpdate {
            total_reserves: floor_sub(current.total_reserves, value),
            gold_value: current.gold_value,
            bond_value: floor_sub(current.bond_value, value),
        },
    })
}

// ============ Redeem ============

fn redeem(ctx: &mut IssuanceContext<'_>, amount: u64) -> BondGoldResult<IssuanceReceipt> {
    let plan = validate_redeem(ctx, amount)?;
    ctx.phase = IssuancePhase::Committing;

    let owner = ctx.call.caller;
    ctx.state.ledger.burn(&owner, amount)?;
    ctx.state.total_reserves = plan.total_reserves;
    ctx.state.total_gold_value = plan.total_gold_value;
    let snapshot_pushed = push_snapshot(ctx, plan.snapshot)?;

    tracing::info!(amount, "tokens redeemed for gold");
    ctx.state.events.emit(BondGoldEvent::TokensBurned {
        owner,
        amount,
        bond_ref: redemption::GOLD_REDEMPTION_REF.to_string(),
    });
    Ok(receipt(ctx, amount, plan.value, snapshot_pushed))
}

fn validate_redeem(ctx: &IssuanceContext<'_>, amount: u64) -> BondGoldResult<Plan> {
    let caller = ctx.call.caller;
    let now = ctx.call.now;

    // 1. Arguments and token balance
    if amount == 0 {
        return Err(BondGoldError::zero("amount"));
    }
    let available = ctx.state.ledger.balance_of(&caller);
    if available < amount {
        return Err(BondGoldError::InsufficientBalance {
            available,
            requested: amount,
        });
    }

    // 2. Gold must be quoted; conversion is 1:1 nominal
    let reading = ctx.oracle.get_gold_price(now);
    if !reading.is_valid {
        return Err(BondGoldError::PriceExpired {
            asset: oracle_consts::GOLD_ASSET.to_string(),
            timestamp: reading.timestamp,
            now,
        });
    }
    if reading.price == 0 {
        return Err(BondGoldError::ValueTooLow { amount, price: 0 });
    }

    // 3. Reserve ratio before the operation
    check_minimum(ctx.registry.calculate_reserve_ratio(), ctx.state.min_reserve_ratio)?;

    // 4. Snapshot push must be able to succeed
    require_snapshot_authority(ctx)?;

    let current = ctx.oracle.get_reserve_data();
    tracing::debug!(amount, gold_price = reading.price, "redeem validated");
    Ok(Plan {
        value: amount,
        total_reserves: floor_sub(ctx.state.total_reserves, amount),
        total_gold_value: floor_sub(ctx.state.total_gold_value, amount),
        snapshot: SnapshotUpdate {
            total_reserves: floor_sub(current.total_reserves, amount),
            gold_value: floor_sub(current.gold_value, amount),
            bond_value: current.bond_value,
        },
    })
}

// ============ Helpers ============

/// amount * price / unit at a fresh bond price
fn bond_value(ctx: &IssuanceContext<'_>, amount: u64, bond_id: &str) -> BondGoldResult<u64> {
    let now = ctx.call.now;
    let reading = ctx.oracle.get_bond_price(bond_id, now);
    if !reading.is_valid {
        return Err(BondGoldError::PriceExpired {
            asset: AssetKey::bond(bond_id).to_string(),
            timestamp: reading.timestamp,
            now,
        });
    }

    let value = calculate_bond_value(amount, reading.price)?;
    if value == 0 {
        return Err(BondGoldError::ValueTooLow {
            amount,
            price: reading.price,
        });
    }
    Ok(value)
}

/// The registry must accept this protocol's capability, and under an
/// atomic policy so must the oracle
fn require_commit_authority(ctx: &IssuanceContext<'_>) -> BondGoldResult<()> {
    ctx.state
        .capability()
        .verify(Role::Issuer, &ctx.registry.issuance_protocol())?;
    require_snapshot_authority(ctx)
}

fn require_snapshot_authority(ctx: &IssuanceContext<'_>) -> BondGoldResult<()> {
    if ctx.state.snapshot_policy == SnapshotPolicy::Atomic
        && !ctx.oracle.is_authorized_source(&ctx.state.identity)
    {
        return Err(BondGoldError::UnauthorizedSource {
            caller: ctx.state.identity,
        });
    }
    Ok(())
}

/// Push the reserve snapshot as this protocol
///
/// Returns whether the push landed. Only a best-effort push may fail
/// without aborting.
fn push_snapshot(ctx: &mut IssuanceContext<'_>, snapshot: SnapshotUpdate) -> BondGoldResult<bool> {
    let as_protocol = CallContext::new(ctx.state.identity, ctx.call.now);
    let result = ctx.oracle.update_reserve_data(
        &as_protocol,
        snapshot.total_reserves,
        snapshot.gold_value,
        snapshot.bond_value,
    );

    match (result, ctx.state.snapshot_policy) {
        (Ok(()), _) => Ok(true),
        (Err(err), SnapshotPolicy::BestEffort) => {
            tracing::warn!(code = err.code(), %err, "reserve snapshot push failed, continuing");
            Ok(false)
        }
        (Err(err), SnapshotPolicy::Atomic) => Err(err),
    }
}

fn receipt(ctx: &IssuanceContext<'_>, amount: u64, value: u64, snapshot_pushed: bool) -> IssuanceReceipt {
    let owner = ctx.call.caller;
    IssuanceReceipt {
        owner,
        amount,
        value,
        balance_after: ctx.state.ledger.balance_of(&owner),
        total_supply_after: ctx.state.ledger.total_supply(),
        snapshot_pushed,
    }
}
