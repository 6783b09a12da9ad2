//! Collateral Registry - Bond Ledger for BondGold
//!
//! Owns every bond position, the per-holder balances and the global
//! counters from which the reserve ratio is computed.
//!
//! ## Core Operations
//!
//! - **DepositBond**: Credit bond collateral; the first depositor owns the bond
//! - **WithdrawBond**: Return collateral to its owner (ratio permitting)
//! - **ConsumeCollateral**: Issuer-only debit backing a mint
//! - **ReleaseCollateral**: Issuer-only credit on burn
//!
//! ## Invariants
//!
//! - One owner per bond identifier for the lifetime of the position
//! - For every bond, the holder balances sum to the position amount
//! - Both global counters move together under 1:1 backing; debits floor at zero
//! - Positions are never deleted, only zeroed or invalidated

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use bondgold_common::{
    access_control::{require_admin, Capability, Role},
    constants::limits,
    errors::{BondGoldError, BondGoldResult},
    events::{BondGoldEvent, EventLog},
    math::{calculate_reserve_ratio, floor_sub, safe_add},
    reserve_guard::{check_minimum, compliance_status},
    types::{Address, BondId, BondPosition, CallContext, ComplianceStatus, GlobalCounters},
    ProtocolConfig, RatioCheck, ReentrancyGuard,
};

// ============ Registry State ============

/// Bond positions, holder balances and global counters
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CollateralRegistry {
    /// Positions by bond identifier
    positions: BTreeMap<BondId, BondPosition>,
    /// Amount credited per (owner, bond)
    balances: BTreeMap<(Address, BondId), u64>,
    /// Bonds with a non-zero balance per owner, unordered
    holder_bonds: BTreeMap<Address, Vec<BondId>>,
    /// Registry-wide totals
    counters: GlobalCounters,
    /// Admin (bond lifecycle)
    admin: Address,
    /// Only identity allowed to consume/release
    issuance_protocol: Address,
    min_reserve_ratio: u64,
    max_reserve_ratio: u64,
    ratio_check: RatioCheck,
    #[borsh(skip)]
    guard: ReentrancyGuard,
    #[borsh(skip)]
    events: EventLog,
}

impl CollateralRegistry {
    /// Create an empty registry
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            positions: BTreeMap::new(),
            balances: BTreeMap::new(),
            holder_bonds: BTreeMap::new(),
            counters: GlobalCounters::default(),
            admin: config.admin,
            issuance_protocol: config.issuance_protocol,
            min_reserve_ratio: config.min_reserve_ratio,
            max_reserve_ratio: config.max_reserve_ratio,
            ratio_check: config.ratio_check,
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // ============ Holder Operations ============

    /// Deposit `amount` of bond `bond_id`
    ///
    /// The first deposit creates the position with the caller as owner.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty id or listing reference, or a zero amount
    /// - `NotOwner` if the bond belongs to someone else
    /// - `InvalidPosition` if the bond was invalidated
    /// - `Overflow` if the position, the holder balance or a registry counter would overflow
    pub fn deposit_bond(
        &mut self,
        ctx: &CallContext,
        bond_id: &str,
        amount: u64,
        listing_ref: &str,
    ) -> BondGoldResult<()> {
        validate_bond_id(bond_id)?;
        if listing_ref.is_empty() {
            return Err(BondGoldError::empty("listing_ref"));
        }
        if listing_ref.len() > limits::MAX_LABEL_LEN {
            return Err(BondGoldError::InvalidArgument {
                param: "listing_ref",
                reason: "too long",
            });
        }
        if amount == 0 {
            return Err(BondGoldError::zero("amount"));
        }

        self.guard.enter("deposit_bond")?;
        let result = self.apply_deposit(ctx, bond_id, amount, listing_ref);
        self.guard.exit();
        result
    }

    fn apply_deposit(
        &mut self,
        ctx: &CallContext,
        bond_id: &str,
        amount: u64,
        listing_ref: &str,
    ) -> BondGoldResult<()> {
        // 1. Existing positions accept deposits from their owner only
        if let Some(position) = self.positions.get(bond_id) {
            if !position.is_owned_by(&ctx.caller) {
                return Err(BondGoldError::NotOwner {
                    bond_id: bond_id.to_string(),
                });
            }
            if !position.is_valid {
                return Err(BondGoldError::InvalidPosition {
                    bond_id: bond_id.to_string(),
                });
            }
        }

        // 2. Counters must absorb the deposit before a new position exists
        let mut after = self.counters;
        after.credit(amount)?;

        // 3. Credit; a new position is verified at deposit time (authenticity
        // against an external registry is not checked)
        self.positions.entry(bond_id.to_string()).or_insert_with(|| {
            tracing::info!(bond_id, "bond position created");
            BondPosition::new(bond_id.to_string(), ctx.caller, listing_ref.to_string(), ctx.now)
        });
        self.credit(&ctx.caller, bond_id, amount)?;

        tracing::info!(bond_id, amount, "bond deposited");
        self.events.emit(BondGoldEvent::BondDeposited {
            bond_id: bond_id.to_string(),
            amount,
            owner: ctx.caller,
        });
        Ok(())
    }

    /// Withdraw `amount` of bond `bond_id` back to its owner
    ///
    /// The ratio check runs against the registry before the withdrawal.
    /// With [`RatioCheck::PostState`] the ratio left behind is checked as
    /// well, unless the withdrawal empties the registry.
    ///
    /// # Errors
    /// - `InsufficientBalance` if the caller holds less than `amount`
    /// - `NotOwner` / `InvalidPosition` as for deposits
    /// - `RatioViolation` if the reserve ratio is below the minimum
    pub fn withdraw_bond(&mut self, ctx: &CallContext, bond_id: &str, amount: u64) -> BondGoldResult<()> {
        validate_bond_id(bond_id)?;
        if amount == 0 {
            return Err(BondGoldError::zero("amount"));
        }

        self.guard.enter("withdraw_bond")?;
        let result = self.apply_withdraw(ctx, bond_id, amount);
        self.guard.exit();
        result
    }

    fn apply_withdraw(&mut self, ctx: &CallContext, bond_id: &str, amount: u64) -> BondGoldResult<()> {
        // 1. Caller must hold enough
        let available = self.get_user_bond_balance(&ctx.caller, bond_id);
        if available < amount {
            return Err(BondGoldError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        // 2. Owner of a valid position
        self.require_owned_valid(&ctx.caller, bond_id)?;

        // 3. Reserve ratio
        check_minimum(self.calculate_reserve_ratio(), self.min_reserve_ratio)?;
        if self.ratio_check == RatioCheck::PostState {
            let mut after = self.counters;
            after.debit(amount);
            if after.total_bond_value > 0 {
                check_minimum(
                    calculate_reserve_ratio(after.total_gold_value, after.total_bond_value),
                    self.min_reserve_ratio,
                )?;
            }
        }

        // 4. Debit
        self.debit(&ctx.caller, bond_id, amount);

        tracing::info!(bond_id, amount, "bond withdrawn");
        self.events.emit(BondGoldEvent::BondWithdrawn {
            bond_id: bond_id.to_string(),
            amount,
            owner: ctx.caller,
        });
        Ok(())
    }

    // ============ Issuer Operations ============

    /// Debit `owner`'s collateral to back a mint (issuer only)
    ///
    /// # Errors
    /// - `Unauthorized` unless `cap` is the configured issuer
    /// - `InsufficientBalance` if `owner` holds less than `amount`
    pub fn consume_collateral(
        &mut self,
        cap: &Capability,
        owner: &Address,
        bond_id: &str,
        amount: u64,
    ) -> BondGoldResult<()> {
        cap.verify(Role::Issuer, &self.issuance_protocol)?;
        validate_bond_id(bond_id)?;
        if amount == 0 {
            return Err(BondGoldError::zero("amount"));
        }

        self.guard.enter("consume_collateral")?;
        let available = self.get_user_bond_balance(owner, bond_id);
        let result = if available < amount {
            Err(BondGoldError::InsufficientBalance {
                available,
                requested: amount,
            })
        } else {
            self.debit(owner, bond_id, amount);
            tracing::debug!(bond_id, amount, "collateral consumed");
            Ok(())
        };
        self.guard.exit();
        result
    }

    /// Credit collateral back to `owner` on burn (issuer only)
    ///
    /// There is no upper bound: under 1:1 backing a release can only
    /// restore collateral, never create an undercollateralized state.
    ///
    /// # Errors
    /// - `Unauthorized` unless `cap` is the configured issuer
    /// - `InvalidPosition` if the bond does not exist
    /// - `NotOwner` if `owner` does not own the bond
    /// - `Overflow` if the release does not fit the registry counters
    pub fn release_collateral(
        &mut self,
        cap: &Capability,
        owner: &Address,
        bond_id: &str,
        amount: u64,
    ) -> BondGoldResult<()> {
        cap.verify(Role::Issuer, &self.issuance_protocol)?;
        validate_bond_id(bond_id)?;
        if amount == 0 {
            return Err(BondGoldError::zero("amount"));
        }

        self.guard.enter("release_collateral")?;
        let result = self.apply_release(owner, bond_id, amount);
        self.guard.exit();
        result
    }

    fn apply_release(&mut self, owner: &Address, bond_id: &str, amount: u64) -> BondGoldResult<()> {
        let position = self.positions.get(bond_id).ok_or_else(|| BondGoldError::InvalidPosition {
            bond_id: bond_id.to_string(),
        })?;
        if !position.is_owned_by(owner) {
            return Err(BondGoldError::NotOwner {
                bond_id: bond_id.to_string(),
            });
        }

        self.credit(owner, bond_id, amount)?;
        tracing::debug!(bond_id, amount, "collateral released");
        Ok(())
    }

    // ============ Admin Operations ============

    /// Refresh a bond's verification time and mark it valid (admin only)
    pub fn reverify_bond(&mut self, ctx: &CallContext, bond_id: &str) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;
        let position = self.position_mut(bond_id)?;
        position.last_verified = ctx.now;
        position.is_valid = true;

        tracing::info!(bond_id, verified_at = ctx.now, "bond reverified");
        self.events.emit(BondGoldEvent::BondReverified {
            bond_id: bond_id.to_string(),
            verified_at: ctx.now,
        });
        Ok(())
    }

    /// Block all further operations on a bond (admin only)
    pub fn invalidate_bond(&mut self, ctx: &CallContext, bond_id: &str) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;
        self.position_mut(bond_id)?.is_valid = false;

        tracing::warn!(bond_id, "bond invalidated");
        self.events.emit(BondGoldEvent::BondInvalidated {
            bond_id: bond_id.to_string(),
        });
        Ok(())
    }

    // ============ Query Functions ============

    /// floor(total_gold_value * 100 / total_bond_value), or 0 without bonds
    pub fn calculate_reserve_ratio(&self) -> u64 {
        calculate_reserve_ratio(self.counters.total_gold_value, self.counters.total_bond_value)
    }

    /// Where the ratio sits relative to [minimum, maximum]
    pub fn compliance_status(&self) -> ComplianceStatus {
        compliance_status(
            self.calculate_reserve_ratio(),
            self.min_reserve_ratio,
            self.max_reserve_ratio,
        )
    }

    pub fn is_reserve_compliant(&self) -> bool {
        self.compliance_status() == ComplianceStatus::Compliant
    }

    pub fn get_bond_info(&self, bond_id: &str) -> Option<&BondPosition> {
        self.positions.get(bond_id)
    }

    /// Bonds `owner` currently holds; order is not stable
    pub fn get_user_bonds(&self, owner: &Address) -> &[BondId] {
        self.holder_bonds.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_user_bond_balance(&self, owner: &Address, bond_id: &str) -> u64 {
        self.balances
            .get(&(*owner, bond_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn counters(&self) -> GlobalCounters {
        self.counters
    }

    pub fn min_reserve_ratio(&self) -> u64 {
        self.min_reserve_ratio
    }

    /// Identity accepted by consume/release
    pub fn issuance_protocol(&self) -> Address {
        self.issuance_protocol
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    // ============ Events & Persistence ============

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<BondGoldEvent> {
        self.events.drain()
    }

    /// Encode positions, balances, counters and configuration
    pub fn to_bytes(&self) -> BondGoldResult<Vec<u8>> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> BondGoldResult<Self> {
        Ok(Self::try_from_slice(bytes)?)
    }

    // ============ Internal Helpers ============

    fn require_owned_valid(&self, caller: &Address, bond_id: &str) -> BondGoldResult<()> {
        let position = self.positions.get(bond_id).ok_or_else(|| BondGoldError::InvalidPosition {
            bond_id: bond_id.to_string(),
        })?;
        if !position.is_owned_by(caller) {
            return Err(BondGoldError::NotOwner {
                bond_id: bond_id.to_string(),
            });
        }
        if !position.is_valid {
            return Err(BondGoldError::InvalidPosition {
                bond_id: bond_id.to_string(),
            });
        }
        Ok(())
    }

    fn position_mut(&mut self, bond_id: &str) -> BondGoldResult<&mut BondPosition> {
        self.positions
            .get_mut(bond_id)
            .ok_or_else(|| BondGoldError::InvalidPosition {
                bond_id: bond_id.to_string(),
            })
    }

    /// Credit position, holder balance and counters; all-or-nothing on overflow
    fn credit(&mut self, owner: &Address, bond_id: &str, amount: u64) -> BondGoldResult<()> {
        let key = (*owner, bond_id.to_string());
        let balance = safe_add(self.balances.get(&key).copied().unwrap_or(0), amount)?;
        let mut counters = self.counters;
        counters.credit(amount)?;
        let position = self.position_mut(bond_id)?;
        let new_amount = safe_add(position.amount, amount)?;

        position.amount = new_amount;
        position.valuation = position.valuation.saturating_add(amount);
        self.balances.insert(key, balance);
        self.counters = counters;

        let bonds = self.holder_bonds.entry(*owner).or_default();
        if !bonds.iter().any(|id| id == bond_id) {
            bonds.push(bond_id.to_string());
        }
        Ok(())
    }

    /// Debit holder balance, position and counters; caller checked the balance
    fn debit(&mut self, owner: &Address, bond_id: &str, amount: u64) {
        let key = (*owner, bond_id.to_string());
        let remaining = floor_sub(self.balances.get(&key).copied().unwrap_or(0), amount);

        if remaining == 0 {
            self.balances.remove(&key);
            if let Some(bonds) = self.holder_bonds.get_mut(owner) {
                // Unordered removal: swap with last, then truncate
                if let Some(index) = bonds.iter().position(|id| id == bond_id) {
                    bonds.swap_remove(index);
                }
                if bonds.is_empty() {
                    self.holder_bonds.remove(owner);
                }
            }
        } else {
            self.balances.insert(key, remaining);
        }

        if let Some(position) = self.positions.get_mut(bond_id) {
            position.amount = floor_sub(position.amount, amount);
        }
        self.counters.debit(amount);
    }

    #[cfg(test)]
    pub(crate) fn guard_mut(&mut self) -> &mut ReentrancyGuard {
        &mut self.guard
    }
}

fn validate_bond_id(bond_id: &str) -> BondGoldResult<()> {
    if bond_id.is_empty() {
        return Err(BondGoldError::empty("bond_id"));
    }
    if bond_id.len() > limits::MAX_BOND_ID_LEN {
        return Err(BondGoldError::InvalidArgument {
            param: "bond_id",
            reason: "too long",
        });
    }
    Ok(())
}

// ============ Tests ============
