// 2.0 oracle.rs: the price gate. wraps an external feed behind a trait and
// enforces freshness, bounds, and a manual circuit breaker. every price-dependent
// operation in the engine reads through here, fresh, at the start of the operation.

use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single observation from a price source. Staleness is measured against
/// `observed_at`, not against when the gate last looked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceObservation {
    pub value: Decimal,
    pub observed_at: Timestamp,
}

impl PriceObservation {
    pub fn new(value: Decimal, observed_at: Timestamp) -> Self {
        Self { value, observed_at }
    }
}

/// Trait for price feed adapters. Implement this to integrate with a specific
/// oracle network or data source. The gate never caches across reads.
pub trait PriceSource: fmt::Debug {
    /// Human readable name, carried in feed-reference change events.
    fn name(&self) -> &str;

    /// Latest observation, or None if the source has nothing to report.
    fn latest(&self) -> Option<PriceObservation>;
}

/// In-memory source driven by tests and the simulation binary.
#[derive(Debug, Clone)]
pub struct MockPriceSource {
    name: String,
    observation: Option<PriceObservation>,
}

impl MockPriceSource {
    pub fn new(name: &str, value: Decimal, observed_at: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            observation: Some(PriceObservation::new(value, observed_at)),
        }
    }

    pub fn set_price(&mut self, value: Decimal, observed_at: Timestamp) {
        self.observation = Some(PriceObservation::new(value, observed_at));
    }

    pub fn go_offline(&mut self) {
        self.observation = None;
    }
}

impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn latest(&self) -> Option<PriceObservation> {
        self.observation
    }
}

/// Gate parameters fixed at construction. Bounds are runtime state on the
/// gate itself since admins move them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleParams {
    pub min_bound: Decimal,
    pub max_bound: Decimal,
    /// Maximum observation age in milliseconds before the price is unusable.
    pub max_staleness_ms: i64,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            min_bound: dec!(0.5),
            max_bound: dec!(2.0),
            max_staleness_ms: 300_000,
        }
    }
}

/// Gate failures. These are the only errors expected under normal operation
/// (feed lag); callers may retry after the triggering condition clears.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("price is stale: observation age {age_ms}ms exceeds {max_ms}ms")]
    StalePrice { age_ms: i64, max_ms: i64 },

    #[error("price {value} outside bounds [{min}, {max}]")]
    InvalidPrice {
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("circuit breaker is active")]
    CircuitBreakerActive,

    #[error("price feed unavailable")]
    FeedUnavailable,
}

/// Non-failing read surface: raw value plus validity, for metrics and
/// external observers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceStatus {
    pub value: Option<Decimal>,
    pub observed_at: Option<Timestamp>,
    pub is_valid: bool,
    pub circuit_broken: bool,
}

/// The gate itself. Owns the source reference, the bounds, and the breaker flag.
#[derive(Debug)]
pub struct PriceGate {
    source: Box<dyn PriceSource>,
    min_bound: Decimal,
    max_bound: Decimal,
    max_staleness_ms: i64,
    circuit_broken: bool,
}

impl PriceGate {
    pub fn new(source: Box<dyn PriceSource>, params: &OracleParams) -> Self {
        Self {
            source,
            min_bound: params.min_bound,
            max_bound: params.max_bound,
            max_staleness_ms: params.max_staleness_ms,
            circuit_broken: false,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Swap the feed reference. Authorization is the engine's job.
    pub fn set_source(&mut self, source: Box<dyn PriceSource>) {
        self.source = source;
    }

    /// Bounds must already be validated (min < max) by the caller.
    pub fn set_bounds(&mut self, min: Decimal, max: Decimal) {
        debug_assert!(min < max);
        self.min_bound = min;
        self.max_bound = max;
    }

    pub fn bounds(&self) -> (Decimal, Decimal) {
        (self.min_bound, self.max_bound)
    }

    pub fn trigger_breaker(&mut self) {
        self.circuit_broken = true;
    }

    pub fn reset_breaker(&mut self) {
        self.circuit_broken = false;
    }

    pub fn is_broken(&self) -> bool {
        self.circuit_broken
    }

    /// The validation gate. A price is usable iff the breaker is off, the
    /// observation is fresh, and the value sits inside the bounds.
    pub fn current_price(&self, now: Timestamp) -> Result<Price, OracleError> {
        if self.circuit_broken {
            return Err(OracleError::CircuitBreakerActive);
        }

        let obs = self.source.latest().ok_or(OracleError::FeedUnavailable)?;

        let age_ms = now.millis_since(obs.observed_at);
        if age_ms > self.max_staleness_ms {
            return Err(OracleError::StalePrice {
                age_ms,
                max_ms: self.max_staleness_ms,
            });
        }

        if obs.value < self.min_bound || obs.value > self.max_bound {
            return Err(OracleError::InvalidPrice {
                value: obs.value,
                min: self.min_bound,
                max: self.max_bound,
            });
        }

        Price::new(obs.value).ok_or(OracleError::InvalidPrice {
            value: obs.value,
            min: self.min_bound,
            max: self.max_bound,
        })
    }

    /// Read-only status that never fails. Metrics endpoints use this so they
    /// keep answering while the gate rejects mutations.
    pub fn status(&self, now: Timestamp) -> PriceStatus {
        let obs = self.source.latest();
        PriceStatus {
            value: obs.map(|o| o.value),
            observed_at: obs.map(|o| o.observed_at),
            is_valid: self.current_price(now).is_ok(),
            circuit_broken: self.circuit_broken,
        }
    }
}
