//! Non-reentrant Guard
//!
//! A re-entry flag checked at entry and cleared at exit of each guarded
//! entry point. A call path that re-enters a store before the running
//! operation completes is rejected instead of observing half-applied state.

use crate::errors::{BondGoldError, BondGoldResult};

/// Per-store re-entry flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReentrancyGuard {
    /// Operation currently holding the guard
    active: Option<&'static str>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `operation` as running
    ///
    /// # Errors
    /// - `Reentrancy` if any guarded operation is already running
    pub fn enter(&mut self, operation: &'static str) -> BondGoldResult<()> {
        if let Some(running) = self.active {
            tracing::warn!(operation, running, "rejected reentrant call");
            return Err(BondGoldError::Reentrancy { operation });
        }
        self.active = Some(operation);
        Ok(())
    }

    /// Clear the flag; must follow every successful `enter`
    pub fn exit(&mut self) {
        self.active = None;
    }

    /// Operation currently running, if any
    pub fn active(&self) -> Option<&'static str> {
        self.active
    }

    pub fn is_locked(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_exit() {
        let mut guard = ReentrancyGuard::new();
        assert!(guard.enter("deposit").is_ok());
        assert_eq!(guard.active(), Some("deposit"));
        guard.exit();
        assert!(!guard.is_locked());
    }

    #[test]
    fn test_reentry_rejected() {
        let mut guard = ReentrancyGuard::new();
        guard.enter("mint").unwrap();

        let result = guard.enter("burn");
        assert_eq!(result, Err(BondGoldError::Reentrancy { operation: "burn" }));
        // The original holder keeps the guard
        assert_eq!(guard.active(), Some("mint"));
    }
}
