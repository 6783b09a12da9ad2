//! Price Oracle Cache
//!
//! Holds the latest quote per asset (gold and each bond) and the single
//! current reserve snapshot. Only authorized sources write; reads are
//! side-effect free and report staleness instead of failing.
//!
//! ## Validity
//!
//! A read is valid while `now - timestamp <= price_validity_secs`. A quote
//! that was never written reads as price 0 at timestamp 0, so it still
//! reports valid until the clock passes the first validity window.
//! [`PriceOracleCache::verify_price_data`] additionally requires the stored
//! confidence to meet the minimum, which an unwritten quote never does.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use bondgold_common::{
    access_control::require_admin,
    constants::limits,
    errors::{BondGoldError, BondGoldResult},
    events::{BondGoldEvent, EventLog},
    types::{
        is_within_window, Address, AssetKey, CallContext, PriceQuote, PriceReading,
        ProofOfReserves, ReserveSnapshot, Timestamp, ZERO_ADDRESS,
    },
    ProtocolConfig, ReentrancyGuard,
};

// ============ Oracle State ============

/// Quote and reserve-snapshot store
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PriceOracleCache {
    /// Latest quote per asset
    quotes: BTreeMap<AssetKey, PriceQuote>,
    /// Current reserve snapshot
    reserve: ReserveSnapshot,
    /// Authorized sources and their labels
    sources: BTreeMap<Address, String>,
    /// Admin (manages sources)
    admin: Address,
    /// Maximum quote age
    price_validity_secs: u64,
    /// Minimum accepted confidence
    min_confidence: u8,
    #[borsh(skip)]
    guard: ReentrancyGuard,
    #[borsh(skip)]
    events: EventLog,
}

impl PriceOracleCache {
    /// Create an empty cache with no sources
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            quotes: BTreeMap::new(),
            reserve: ReserveSnapshot::default(),
            sources: BTreeMap::new(),
            admin: config.admin,
            price_validity_secs: config.price_validity_secs,
            min_confidence: config.min_confidence,
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    // ============ Source Management ============

    /// Register `source` under `label` (admin only)
    ///
    /// Re-registering an existing source replaces its label. Cached quotes
    /// are unaffected.
    pub fn add_source(&mut self, ctx: &CallContext, source: Address, label: &str) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;

        if source == ZERO_ADDRESS {
            return Err(BondGoldError::InvalidArgument {
                param: "source",
                reason: "cannot be zero address",
            });
        }
        validate_label("label", label)?;

        self.sources.insert(source, label.to_string());
        tracing::info!(label, "price source added");
        self.events.emit(BondGoldEvent::SourceAdded {
            source,
            label: label.to_string(),
        });
        Ok(())
    }

    /// Deregister `source` (admin only); cached quotes are unaffected
    pub fn remove_source(&mut self, ctx: &CallContext, source: Address) -> BondGoldResult<()> {
        require_admin(&ctx.caller, &self.admin)?;

        if self.sources.remove(&source).is_none() {
            return Err(BondGoldError::InvalidArgument {
                param: "source",
                reason: "not registered",
            });
        }

        tracing::info!("price source removed");
        self.events.emit(BondGoldEvent::SourceRemoved { source });
        Ok(())
    }

    pub fn is_authorized_source(&self, source: &Address) -> bool {
        self.sources.contains_key(source)
    }

    /// Label registered for `source`
    pub fn source_label(&self, source: &Address) -> Option<&str> {
        self.sources.get(source).map(String::as_str)
    }

    // ============ Updates ============

    /// Overwrite the gold quote
    pub fn update_gold_price(
        &mut self,
        ctx: &CallContext,
        price: u64,
        confidence: u8,
        source: &str,
    ) -> BondGoldResult<()> {
        self.guard.enter("update_gold_price")?;
        let result = self.write_quote(ctx, AssetKey::Gold, price, confidence, source);
        self.guard.exit();
        result
    }

    /// Overwrite the quote for `bond_id`
    pub fn update_bond_price(
        &mut self,
        ctx: &CallContext,
        bond_id: &str,
        price: u64,
        confidence: u8,
        source: &str,
    ) -> BondGoldResult<()> {
        if bond_id.is_empty() {
            return Err(BondGoldError::empty("bond_id"));
        }

        self.guard.enter("update_bond_price")?;
        let result = self.write_quote(ctx, AssetKey::bond(bond_id), price, confidence, source);
        self.guard.exit();
        result
    }

    /// Overwrite the reserve snapshot and mark it valid
    pub fn update_reserve_data(
        &mut self,
        ctx: &CallContext,
        total_reserves: u64,
        gold_value: u64,
        bond_value: u64,
    ) -> BondGoldResult<()> {
        self.require_source(&ctx.caller)?;
        self.guard.enter("update_reserve_data")?;

        self.reserve = ReserveSnapshot {
            total_reserves,
            gold_value,
            bond_value,
            timestamp: ctx.now,
            is_valid: true,
        };

        tracing::info!(total_reserves, gold_value, bond_value, "reserve snapshot updated");
        self.events.emit(BondGoldEvent::ReserveUpdated {
            total_reserves,
            gold_value,
            timestamp: ctx.now,
        });

        self.guard.exit();
        Ok(())
    }

    fn write_quote(
        &mut self,
        ctx: &CallContext,
        asset: AssetKey,
        price: u64,
        confidence: u8,
        source: &str,
    ) -> BondGoldResult<()> {
        // 1. Only authorized sources
        self.require_source(&ctx.caller)?;

        // 2. Price must be positive
        if price == 0 {
            return Err(BondGoldError::zero("price"));
        }

        // 3. Confidence must meet the minimum
        if confidence < self.min_confidence {
            tracing::debug!(%asset, confidence, "quote rejected for low confidence");
            return Err(BondGoldError::InvalidArgument {
                param: "confidence",
                reason: "below minimum confidence",
            });
        }
        if confidence > 100 {
            return Err(BondGoldError::InvalidArgument {
                param: "confidence",
                reason: "above 100",
            });
        }

        // 4. Source label required
        validate_label("source", source)?;

        tracing::info!(%asset, price, confidence, source, "price updated");
        self.events.emit(BondGoldEvent::PriceUpdated {
            asset: asset.clone(),
            price,
            timestamp: ctx.now,
        });
        self.quotes.insert(
            asset.clone(),
            PriceQuote {
                asset,
                price,
                confidence,
                timestamp: ctx.now,
                source: source.to_string(),
            },
        );
        Ok(())
    }

    fn require_source(&self, caller: &Address) -> BondGoldResult<()> {
        if !self.is_authorized_source(caller) {
            return Err(BondGoldError::UnauthorizedSource { caller: *caller });
        }
        Ok(())
    }

    // ============ Query Functions ============

    /// Gold price as (price, timestamp, isValid)
    pub fn get_gold_price(&self, now: Timestamp) -> PriceReading {
        self.read(&AssetKey::Gold, now)
    }

    /// Bond price as (price, timestamp, isValid)
    pub fn get_bond_price(&self, bond_id: &str, now: Timestamp) -> PriceReading {
        self.read(&AssetKey::bond(bond_id), now)
    }

    /// Stored quote, if one was ever written
    pub fn get_quote(&self, asset: &AssetKey) -> Option<&PriceQuote> {
        self.quotes.get(asset)
    }

    /// True only if the stored quote is both recent and confident enough
    pub fn verify_price_data(&self, asset: &AssetKey, now: Timestamp) -> bool {
        match self.quotes.get(asset) {
            Some(quote) => {
                quote.is_fresh(now, self.price_validity_secs) && quote.confidence >= self.min_confidence
            }
            None => false,
        }
    }

    /// Current reserve snapshot
    pub fn get_reserve_data(&self) -> ReserveSnapshot {
        self.reserve
    }

    /// Reserve snapshot with a SHA-256 attestation digest
    pub fn proof_of_reserves(&self) -> ProofOfReserves {
        let snapshot = &self.reserve;
        let mut hasher = Sha256::new();
        hasher.update(snapshot.total_reserves.to_le_bytes());
        hasher.update(snapshot.gold_value.to_le_bytes());
        hasher.update(snapshot.bond_value.to_le_bytes());
        hasher.update(snapshot.timestamp.to_le_bytes());
        hasher.update([snapshot.is_valid as u8]);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());

        ProofOfReserves {
            total_reserves: snapshot.total_reserves,
            gold_value: snapshot.gold_value,
            timestamp: snapshot.timestamp,
            digest,
        }
    }

    pub fn price_validity_secs(&self) -> u64 {
        self.price_validity_secs
    }

    fn read(&self, asset: &AssetKey, now: Timestamp) -> PriceReading {
        let (price, timestamp) = self
            .quotes
            .get(asset)
            .map_or((0, 0), |quote| (quote.price, quote.timestamp));

        PriceReading {
            price,
            timestamp,
            is_valid: is_within_window(timestamp, now, self.price_validity_secs),
        }
    }

    // ============ Events & Persistence ============

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<BondGoldEvent> {
        self.events.drain()
    }

    /// Encode persistent state (quotes, snapshot, sources, thresholds)
    pub fn to_bytes(&self) -> BondGoldResult<Vec<u8>> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> BondGoldResult<Self> {
        Ok(Self::try_from_slice(bytes)?)
    }

    #[cfg(test)]
    pub(crate) fn guard_mut(&mut self) -> &mut ReentrancyGuard {
        &mut self.guard
    }
}

fn validate_label(param: &'static str, label: &str) -> BondGoldResult<()> {
    if label.is_empty() {
        return Err(BondGoldError::empty(param));
    }
    if label.len() > limits::MAX_LABEL_LEN {
        return Err(BondGoldError::InvalidArgument {
            param,
            reason: "too long",
        });
    }
    Ok(())
}

// ============ Tests ============

#[cfg(test)]
mod tests {
    use super::*;
    use bondgold_common::events::EventType;

    const ADMIN: Address = [1u8; 32];
    const ISSUER: Address = [2u8; 32];
    const FEED: Address = [3u8; 32];
    const STRANGER: Address = [9u8; 32];

    const GOLD_PRICE: u64 = 2_350_00000000; // $2,350 with 8 decimals
    const HOUR: u64 = 3_600;
    const T0: u64 = 1_700_000_000;

    fn create_test_cache() -> PriceOracleCache {
        let mut cache = PriceOracleCache::new(&ProtocolConfig::new(ADMIN, ISSUER));
        cache
            .add_source(&CallContext::new(ADMIN, T0), FEED, "lbma-feed")
            .unwrap();
        cache
    }

    fn at(caller: Address, now: u64) -> CallContext {
        CallContext::new(caller, now)
    }

    #[test]
    fn test_update_gold_price_success() {
        let mut cache = create_test_cache();
        cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA").unwrap();

        let reading = cache.get_gold_price(T0 + 10);
        assert_eq!(reading.price, GOLD_PRICE);
        assert_eq!(reading.timestamp, T0);
        assert!(reading.is_valid);
        assert_eq!(cache.events().filter_by_type(EventType::PriceUpdated).len(), 1);
    }

    #[test]
    fn test_update_unauthorized_source() {
        let mut cache = create_test_cache();
        let result = cache.update_gold_price(&at(STRANGER, T0), GOLD_PRICE, 95, "LBMA");
        assert_eq!(result, Err(BondGoldError::UnauthorizedSource { caller: STRANGER }));
        assert_eq!(cache.get_quote(&AssetKey::Gold), None);
    }

    #[test]
    fn test_update_rejects_bad_input() {
        let mut cache = create_test_cache();
        let ctx = at(FEED, T0);

        assert!(matches!(
            cache.update_gold_price(&ctx, 0, 95, "LBMA"),
            Err(BondGoldError::InvalidArgument { param: "price", .. })
        ));
        assert!(matches!(
            cache.update_gold_price(&ctx, GOLD_PRICE, 79, "LBMA"),
            Err(BondGoldError::InvalidArgument { param: "confidence", .. })
        ));
        assert!(matches!(
            cache.update_gold_price(&ctx, GOLD_PRICE, 95, ""),
            Err(BondGoldError::InvalidArgument { param: "source", .. })
        ));
        assert!(matches!(
            cache.update_bond_price(&ctx, "", GOLD_PRICE, 95, "LBMA"),
            Err(BondGoldError::InvalidArgument { param: "bond_id", .. })
        ));
        assert!(cache.events().filter_by_type(EventType::PriceUpdated).is_empty());
    }

    #[test]
    fn test_confidence_boundary() {
        let mut cache = create_test_cache();
        assert!(cache.update_bond_price(&at(FEED, T0), "US912828", 98_00000000, 80, "desk").is_ok());
    }

    #[test]
    fn test_newer_quote_overwrites() {
        let mut cache = create_test_cache();
        cache.update_bond_price(&at(FEED, T0), "US912828", 98_00000000, 90, "desk").unwrap();
        cache.update_bond_price(&at(FEED, T0 + 60), "US912828", 99_00000000, 85, "desk-2").unwrap();

        let quote = cache.get_quote(&AssetKey::bond("US912828")).unwrap();
        assert_eq!(quote.price, 99_00000000);
        assert_eq!(quote.confidence, 85);
        assert_eq!(quote.timestamp, T0 + 60);
        assert_eq!(quote.source, "desk-2");
    }

    #[test]
    fn test_staleness_boundary_inclusive() {
        let mut cache = create_test_cache();
        cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA").unwrap();

        assert!(cache.get_gold_price(T0 + HOUR).is_valid);
        assert!(!cache.get_gold_price(T0 + HOUR + 1).is_valid);
    }

    #[test]
    fn test_unwritten_quote_genesis_edge() {
        let cache = create_test_cache();

        // At genesis an unwritten quote is still inside the first window
        let reading = cache.get_bond_price("UNKNOWN", 0);
        assert_eq!(reading, PriceReading { price: 0, timestamp: 0, is_valid: true });
        assert!(cache.get_bond_price("UNKNOWN", HOUR).is_valid);

        // Once the clock has advanced it reads invalid
        assert!(!cache.get_bond_price("UNKNOWN", HOUR + 1).is_valid);
        // And it never verifies
        assert!(!cache.verify_price_data(&AssetKey::bond("UNKNOWN"), 0));
    }

    #[test]
    fn test_verify_price_data() {
        let mut cache = create_test_cache();
        cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA").unwrap();

        assert!(cache.verify_price_data(&AssetKey::Gold, T0 + HOUR));
        assert!(!cache.verify_price_data(&AssetKey::Gold, T0 + HOUR + 1));
    }

    #[test]
    fn test_update_reserve_data() {
        let mut cache = create_test_cache();
        assert!(!cache.get_reserve_data().is_valid);

        cache.update_reserve_data(&at(FEED, T0), 1_000, 400, 600).unwrap();

        let snapshot = cache.get_reserve_data();
        assert_eq!(
            snapshot,
            ReserveSnapshot {
                total_reserves: 1_000,
                gold_value: 400,
                bond_value: 600,
                timestamp: T0,
                is_valid: true,
            }
        );

        let result = cache.update_reserve_data(&at(STRANGER, T0), 1, 1, 1);
        assert!(matches!(result, Err(BondGoldError::UnauthorizedSource { .. })));
        assert_eq!(cache.get_reserve_data(), snapshot);
    }

    #[test]
    fn test_proof_of_reserves() {
        let mut cache = create_test_cache();
        cache.update_reserve_data(&at(FEED, T0), 1_000, 400, 600).unwrap();

        let proof = cache.proof_of_reserves();
        assert_eq!(proof.total_reserves, 1_000);
        assert_eq!(proof.gold_value, 400);
        assert_eq!(proof.timestamp, T0);
        // Same snapshot, same digest
        assert_eq!(proof, cache.proof_of_reserves());

        cache.update_reserve_data(&at(FEED, T0), 1_000, 401, 600).unwrap();
        assert_ne!(proof.digest, cache.proof_of_reserves().digest);
    }

    #[test]
    fn test_source_management() {
        let mut cache = create_test_cache();
        assert_eq!(cache.source_label(&FEED), Some("lbma-feed"));

        let result = cache.add_source(&at(STRANGER, T0), STRANGER, "rogue");
        assert_eq!(result, Err(BondGoldError::AdminOnly));

        cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA").unwrap();
        cache.remove_source(&at(ADMIN, T0), FEED).unwrap();
        assert!(!cache.is_authorized_source(&FEED));

        // Removal leaves cached quotes in place
        assert_eq!(cache.get_gold_price(T0).price, GOLD_PRICE);

        let result = cache.remove_source(&at(ADMIN, T0), FEED);
        assert!(matches!(result, Err(BondGoldError::InvalidArgument { .. })));
    }

    #[test]
    fn test_reentrant_update_rejected() {
        let mut cache = create_test_cache();
        cache.guard_mut().enter("update_reserve_data").unwrap();

        let result = cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA");
        assert!(matches!(result, Err(BondGoldError::Reentrancy { .. })));
    }

    #[test]
    fn test_reads_are_idempotent() {
        let mut cache = create_test_cache();
        cache.update_reserve_data(&at(FEED, T0), 10, 5, 5).unwrap();

        assert_eq!(cache.get_reserve_data(), cache.get_reserve_data());
        assert_eq!(cache.get_gold_price(T0), cache.get_gold_price(T0));
    }

    #[test]
    fn test_persistence_round_trip() {
        let mut cache = create_test_cache();
        cache.update_gold_price(&at(FEED, T0), GOLD_PRICE, 95, "LBMA").unwrap();
        cache.update_reserve_data(&at(FEED, T0), 10, 5, 5).unwrap();

        let bytes = cache.to_bytes().unwrap();
        let restored = PriceOracleCache::from_bytes(&bytes).unwrap();

        assert_eq!(restored.get_gold_price(T0), cache.get_gold_price(T0));
        assert_eq!(restored.get_reserve_data(), cache.get_reserve_data());
        assert!(restored.is_authorized_source(&FEED));
        // Events are not persisted
        assert!(restored.events().is_empty());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = PriceOracleCache::from_bytes(&[1, 2, 3]);
        assert!(matches!(result, Err(BondGoldError::Codec { .. })));
    }
}
