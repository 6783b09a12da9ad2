//! Issuance State
//!
//! Persistent state of the issuance protocol: the token ledger, the mint
//! access lists and the running reserve and gold-value totals backing the
//! supply.

use borsh::{BorshDeserialize, BorshSerialize};

use bondgold_common::{
    access_control::{require_admin, AccessList, Capability},
    errors::{BondGoldError, BondGoldResult},
    events::{BondGoldEvent, EventLog},
    types::{Address, CallContext},
    ProtocolConfig, ReentrancyGuard, SnapshotPolicy,
};

use crate::ledger::TokenLedger;

/// Token ledger, access lists and reserve counters
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct IssuanceState {
    /// Identity presented to the registry and the oracle
    pub(crate) identity: Address,
    pub(crate) admin: Address,
    pub(crate) ledger: TokenLedger,
    pub(crate) access: AccessList,
    /// Running total of reserves credited by mint
    pub(crate) total_reserves: u64,
    /// Running gold-equivalent value backing the supply; redeem draws it down
    pub(crate) total_gold_value: u64,
    pub(crate) min_reserve_ratio: u64,
    pub(crate) verification_validity_secs: u64,
    pub(crate) snapshot_policy: SnapshotPolicy,
    #[borsh(skip)]
    pub(crate) guard: ReentrancyGuard,
    #[borsh(skip)]
    pub(crate) events: EventLog,
}

impl IssuanceState {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            identity: config.issuance_protocol,
            admin: config.admin,
            ledger: TokenLedger::new(),
            access: AccessList::new(),
            total_reserves: 0,
            total_gold_value: 0,
            min_reserve_ratio: config.min_reserve_ratio,
            verification_validity_secs: config.verification_validity_secs,
            snapshot_policy: config.snapshot_policy,
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // ============ Admin Operations ============

    /// Add or remove `account` from the mint allow-list (admin only)
    pub fn set_whitelisted(&mut self, ctx: &CallContext, account: Address, allowed: bool) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;
        self.access.set_whitelisted(account, allowed);
        self.emit_access_change(account);
        Ok(())
    }

    /// Add or remove `account` from the deny-list (admin only)
    pub fn set_blacklisted(&mut self, ctx: &CallContext, account: Address, denied: bool) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;
        self.access.set_blacklisted(account, denied);
        self.emit_access_change(account);
        Ok(())
    }

    fn emit_access_change(&mut self, account: Address) {
        let whitelisted = self.access.is_whitelisted(&account);
        let blacklisted = self.access.is_blacklisted(&account);
        tracing::info!(whitelisted, blacklisted, "access list changed");
        self.events.emit(BondGoldEvent::AccessListChanged {
            account,
            whitelisted,
            blacklisted,
        });
    }

    // ============ Holder Operations ============

    /// Move `amount` tokens from the caller to `to`
    ///
    /// # Errors
    /// - `Blacklisted` if either side is on the deny-list
    /// - `InsufficientBalance` if the caller holds less than `amount`
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u64) -> BondGoldResult<()> {
        if amount == 0 {
            return Err(BondGoldError::zero("amount"));
        }
        for account in [ctx.caller, to] {
            if self.access.is_blacklisted(&account) {
                return Err(BondGoldError::Blacklisted { account });
            }
        }

        self.guard.enter("transfer")?;
        let result = self.ledger.transfer(&ctx.caller, &to, amount);
        if result.is_ok() {
            tracing::debug!(amount, "tokens transferred");
            self.events.emit(BondGoldEvent::TokensTransferred {
                from: ctx.caller,
                to,
                amount,
            });
        }
        self.guard.exit();
        result
    }

    // ============ Query Functions ============

    /// Capability this protocol presents to the registry
    pub fn capability(&self) -> Capability {
        Capability::issuer(self.identity)
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.ledger.balance_of(owner)
    }

    pub fn total_supply(&self) -> u64 {
        self.ledger.total_supply()
    }

    pub fn total_reserves(&self) -> u64 {
        self.total_reserves
    }

    pub fn total_gold_value(&self) -> u64 {
        self.total_gold_value
    }

    pub fn access(&self) -> &AccessList {
        &self.access
    }

    pub fn snapshot_policy(&self) -> SnapshotPolicy {
        self.snapshot_policy
    }

    // ============ Events & Persistence ============

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<BondGoldEvent> {
        self.events.drain()
    }

    pub fn to_bytes(&self) -> BondGoldResult<Vec<u8>> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> BondGoldResult<Self> {
        Ok(Self::try_from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondgold_common::events::EventType;

    const ADMIN: Address = [1u8; 32];
    const ISSUER: Address = [2u8; 32];
    const ALICE: Address = [3u8; 32];
    const BOB: Address = [4u8; 32];
    const T0: u64 = 1_700_000_000;

    fn create_test_state() -> IssuanceState {
        IssuanceState::new(&ProtocolConfig::new(ADMIN, ISSUER))
    }

    #[test]
    fn test_access_list_admin_only() {
        let mut state = create_test_state();

        let result = state.set_whitelisted(&CallContext::new(ALICE, T0), ALICE, true);
        assert_eq!(result, Err(BondGoldError::AdminOnly));
        assert!(!state.access().is_whitelisted(&ALICE));

        state.set_whitelisted(&CallContext::new(ADMIN, T0), ALICE, true).unwrap();
        assert!(state.access().is_whitelisted(&ALICE));
        assert_eq!(
            state.events().last(),
            Some(&BondGoldEvent::AccessListChanged {
                account: ALICE,
                whitelisted: true,
                blacklisted: false,
            })
        );
    }

    #[test]
    fn test_transfer() {
        let mut state = create_test_state();
        state.ledger.mint(&ALICE, 100).unwrap();

        state.transfer(&CallContext::new(ALICE, T0), BOB, 40).unwrap();
        assert_eq!(state.balance_of(&ALICE), 60);
        assert_eq!(state.balance_of(&BOB), 40);
        assert_eq!(state.events().filter_by_type(EventType::TokensTransferred).len(), 1);

        let result = state.transfer(&CallContext::new(BOB, T0), ALICE, 41);
        assert!(matches!(result, Err(BondGoldError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_transfer_blocked_by_deny_list() {
        let mut state = create_test_state();
        state.ledger.mint(&ALICE, 100).unwrap();
        state.set_blacklisted(&CallContext::new(ADMIN, T0), BOB, true).unwrap();

        let result = state.transfer(&CallContext::new(ALICE, T0), BOB, 10);
        assert_eq!(result, Err(BondGoldError::Blacklisted { account: BOB }));
        assert_eq!(state.balance_of(&ALICE), 100);
    }

    #[test]
    fn test_capability_names_identity() {
        let state = create_test_state();
        assert_eq!(state.capability(), Capability::issuer(ISSUER));
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut state = create_test_state();
        state.set_whitelisted(&CallContext::new(ADMIN, T0), ALICE, true).unwrap();
        state.ledger.mint(&ALICE, 500).unwrap();
        state.total_reserves = 500;
        state.total_gold_value = 500;

        let restored = IssuanceState::from_bytes(&state.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.balance_of(&ALICE), 500);
        assert_eq!(restored.total_reserves(), 500);
        assert_eq!(restored.total_gold_value(), 500);
        assert!(restored.access().is_whitelisted(&ALICE));
        assert!(restored.events().is_empty());
    }
}
