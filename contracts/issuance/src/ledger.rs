//! Token Ledger
//!
//! Owner balances and supply of the BondGold token. Supply only grows
//! through mint and only shrinks through burn; balances always sum to
//! the total supply. Mutation is crate-private so that only the issuance
//! protocol can change supply.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use bondgold_common::{
    constants::token,
    errors::{BondGoldError, BondGoldResult},
    math::safe_add,
    types::Address,
};

/// Balances and supply tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TokenLedger {
    /// Non-zero balances by owner
    balances: BTreeMap<Address, u64>,
    /// Current supply
    total_supply: u64,
    /// Cumulative minted
    total_minted: u64,
    /// Cumulative burned
    total_burned: u64,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name() -> &'static str {
        token::NAME
    }

    pub fn symbol() -> &'static str {
        token::SYMBOL
    }

    pub fn decimals() -> u8 {
        token::DECIMALS
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn total_minted(&self) -> u64 {
        self.total_minted
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }

    /// Number of owners with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Check if mint would overflow supply
    pub fn can_mint(&self, amount: u64) -> bool {
        self.total_supply.checked_add(amount).is_some()
            && self.total_minted.checked_add(amount).is_some()
    }

    pub(crate) fn mint(&mut self, to: &Address, amount: u64) -> BondGoldResult<()> {
        let new_supply = safe_add(self.total_supply, amount)?;
        let new_balance = safe_add(self.balance_of(to), amount)?;

        self.total_supply = new_supply;
        self.total_minted = self.total_minted.saturating_add(amount);
        self.set_balance(to, new_balance);
        Ok(())
    }

    pub(crate) fn burn(&mut self, from: &Address, amount: u64) -> BondGoldResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(BondGoldError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.set_balance(from, available - amount);
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.total_burned = self.total_burned.saturating_add(amount);
        Ok(())
    }

    pub(crate) fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> BondGoldResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(BondGoldError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let new_to = safe_add(self.balance_of(to), amount)?;
        self.set_balance(from, available - amount);
        self.set_balance(to, new_to);
        Ok(())
    }

    fn set_balance(&mut self, owner: &Address, balance: u64) {
        if balance == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, balance);
        }
    }

    #[cfg(test)]
    pub(crate) fn sum_of_balances(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }
}
