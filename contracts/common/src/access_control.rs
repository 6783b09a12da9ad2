//! Access Control Module
//!
//! Identity checks for privileged entry points.
//!
//! Cross-store calls never rely on ambient caller context: the caller
//! presents a [`Capability`] naming its role and identity, and the store
//! verifies it against the identity it was configured with.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{BondGoldError, BondGoldResult};
use crate::types::{Address, ZERO_ADDRESS};

// ============================================================================
// Types
// ============================================================================

/// Protocol roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Role {
    /// Manages sources, access lists and bond lifecycle
    Admin,
    /// The issuance protocol; may consume and release collateral
    Issuer,
}

/// Explicit proof of identity presented to a privileged entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Claimed role
    pub role: Role,
    /// Identity of the holder
    pub holder: Address,
}

impl Capability {
    pub fn new(role: Role, holder: Address) -> Self {
        Self { role, holder }
    }

    pub fn admin(holder: Address) -> Self {
        Self::new(Role::Admin, holder)
    }

    pub fn issuer(holder: Address) -> Self {
        Self::new(Role::Issuer, holder)
    }

    /// Verify the capability against the configured identity for `role`
    ///
    /// # Errors
    /// - `AdminOnly` for a failed admin check
    /// - `Unauthorized` for any other role or identity mismatch
    pub fn verify(&self, role: Role, expected: &Address) -> BondGoldResult<()> {
        if self.role == role && self.holder == *expected && *expected != ZERO_ADDRESS {
            return Ok(());
        }

        tracing::debug!(?role, claimed = ?self.role, "capability rejected");
        match role {
            Role::Admin => Err(BondGoldError::AdminOnly),
            Role::Issuer => Err(BondGoldError::Unauthorized {
                expected: *expected,
                actual: self.holder,
            }),
        }
    }
}

/// Require `caller` to be the admin
pub fn require_admin(caller: &Address, admin: &Address) -> BondGoldResult<()> {
    Capability::admin(*caller).verify(Role::Admin, admin)
}

/// Mint allow-list and deny-list
///
/// The deny-list wins over the allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessList {
    whitelist: BTreeSet<Address>,
    blacklist: BTreeSet<Address>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `account` from the allow-list
    pub fn set_whitelisted(&mut self, account: Address, allowed: bool) {
        if allowed {
            self.whitelist.insert(account);
        } else {
            self.whitelist.remove(&account);
        }
    }

    /// Add or remove `account` from the deny-list
    pub fn set_blacklisted(&mut self, account: Address, denied: bool) {
        if denied {
            self.blacklist.insert(account);
        } else {
            self.blacklist.remove(&account);
        }
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.contains(account)
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.blacklist.contains(account)
    }

    /// Require `account` to be allowed and not denied
    ///
    /// # Errors
    /// - `NotWhitelisted` if absent from the allow-list
    /// - `Blacklisted` if present on the deny-list
    pub fn check(&self, account: &Address) -> BondGoldResult<()> {
        if !self.is_whitelisted(account) {
            return Err(BondGoldError::NotWhitelisted { account: *account });
        }
        if self.is_blacklisted(account) {
            return Err(BondGoldError::Blacklisted { account: *account });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = [1u8; 32];
    const ISSUER: Address = [2u8; 32];
    const USER: Address = [3u8; 32];

    #[test]
    fn test_capability_verify() {
        assert!(Capability::issuer(ISSUER).verify(Role::Issuer, &ISSUER).is_ok());

        // Right identity, wrong role
        let result = Capability::admin(ISSUER).verify(Role::Issuer, &ISSUER);
        assert!(matches!(result, Err(BondGoldError::Unauthorized { .. })));

        // Right role, wrong identity
        let result = Capability::issuer(USER).verify(Role::Issuer, &ISSUER);
        assert_eq!(
            result,
            Err(BondGoldError::Unauthorized {
                expected: ISSUER,
                actual: USER,
            })
        );
    }

    #[test]
    fn test_zero_identity_never_verifies() {
        let result = Capability::issuer(ZERO_ADDRESS).verify(Role::Issuer, &ZERO_ADDRESS);
        assert!(result.is_err());
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&ADMIN, &ADMIN).is_ok());
        assert_eq!(require_admin(&USER, &ADMIN), Err(BondGoldError::AdminOnly));
    }

    #[test]
    fn test_access_list() {
        let mut list = AccessList::new();
        assert_eq!(list.check(&USER), Err(BondGoldError::NotWhitelisted { account: USER }));

        list.set_whitelisted(USER, true);
        assert!(list.check(&USER).is_ok());

        list.set_blacklisted(USER, true);
        assert_eq!(list.check(&USER), Err(BondGoldError::Blacklisted { account: USER }));

        list.set_blacklisted(USER, false);
        list.set_whitelisted(USER, false);
        assert!(!list.is_whitelisted(&USER));
    }
}
