//! Protocol Events for BondGold
//!
//! Notifications emitted by the stores on every committed state change.
//! Off-chain observers drain them to index deposits, issuance and
//! reserve movements.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetKey, BondId, Timestamp};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Collateral Events (0x01 - 0x1F)
    BondDeposited = 0x01,
    BondWithdrawn = 0x02,
    BondReverified = 0x03,
    BondInvalidated = 0x04,

    // Token Events (0x20 - 0x3F)
    TokensMinted = 0x20,
    TokensBurned = 0x21,
    TokensTransferred = 0x22,

    // Oracle Events (0x40 - 0x5F)
    PriceUpdated = 0x40,
    ReserveUpdated = 0x41,
    SourceAdded = 0x42,
    SourceRemoved = 0x43,

    // Access Events (0x60 - 0x7F)
    AccessListChanged = 0x60,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum BondGoldEvent {
    // ============ Collateral Events ============

    /// Bond collateral credited to its owner
    BondDeposited {
        bond_id: BondId,
        amount: u64,
        owner: Address,
    },

    /// Bond collateral returned to its owner
    BondWithdrawn {
        bond_id: BondId,
        amount: u64,
        owner: Address,
    },

    /// Verification timestamp refreshed by the admin
    BondReverified {
        bond_id: BondId,
        verified_at: Timestamp,
    },

    /// Position invalidated by the admin
    BondInvalidated { bond_id: BondId },

    // ============ Token Events ============

    /// Tokens minted against bond collateral
    TokensMinted {
        owner: Address,
        amount: u64,
        bond_id: BondId,
    },

    /// Tokens burned; `bond_ref` is the bond id or `GOLD_REDEMPTION`
    TokensBurned {
        owner: Address,
        amount: u64,
        bond_ref: String,
    },

    /// Tokens moved between holders
    TokensTransferred {
        from: Address,
        to: Address,
        amount: u64,
    },

    // ============ Oracle Events ============

    /// Quote overwritten for an asset
    PriceUpdated {
        asset: AssetKey,
        price: u64,
        timestamp: Timestamp,
    },

    /// Reserve snapshot overwritten
    ReserveUpdated {
        total_reserves: u64,
        gold_value: u64,
        timestamp: Timestamp,
    },

    /// Price source registered
    SourceAdded { source: Address, label: String },

    /// Price source removed
    SourceRemoved { source: Address },

    // ============ Access Events ============

    /// Allow-list or deny-list membership changed
    AccessListChanged {
        account: Address,
        whitelisted: bool,
        blacklisted: bool,
    },
}

impl BondGoldEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::BondDeposited { .. } => EventType::BondDeposited,
            Self::BondWithdrawn { .. } => EventType::BondWithdrawn,
            Self::BondReverified { .. } => EventType::BondReverified,
            Self::BondInvalidated { .. } => EventType::BondInvalidated,
            Self::TokensMinted { .. } => EventType::TokensMinted,
            Self::TokensBurned { .. } => EventType::TokensBurned,
            Self::TokensTransferred { .. } => EventType::TokensTransferred,
            Self::PriceUpdated { .. } => EventType::PriceUpdated,
            Self::ReserveUpdated { .. } => EventType::ReserveUpdated,
            Self::SourceAdded { .. } => EventType::SourceAdded,
            Self::SourceRemoved { .. } => EventType::SourceRemoved,
            Self::AccessListChanged { .. } => EventType::AccessListChanged,
        }
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<BondGoldEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: BondGoldEvent) {
        tracing::trace!(event_type = ?event.event_type(), "event emitted");
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[BondGoldEvent] {
        &self.events
    }

    /// Hand all pending events to an observer, leaving the log empty
    pub fn drain(&mut self) -> Vec<BondGoldEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&BondGoldEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&BondGoldEvent> {
        self.events.last()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();

        log.emit(BondGoldEvent::BondDeposited {
            bond_id: "US912828".into(),
            amount: 1_000,
            owner: [2u8; 32],
        });

        log.emit(BondGoldEvent::TokensMinted {
            owner: [2u8; 32],
            amount: 500,
            bond_id: "US912828".into(),
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type(EventType::BondDeposited).len(), 1);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }
}
