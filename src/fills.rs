// 4.0 fills.rs: the exposure fill tracker. each hedge position requests notional
// exposure; only the fraction matched by real issuance demand is "filled".
// PnL and margin ratios elsewhere run on filled notional, never on the raw
// request. records iterate in insertion order.

use crate::types::{PositionId, ReserveAmount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One record per position. Invariant: 0 <= filled <= requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    pub position_id: PositionId,
    pub requested: ReserveAmount,
    pub filled: ReserveAmount,
}

/// Before/after picture of a single record change, emitted as an event for
/// downstream reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillAdjustment {
    pub position_id: PositionId,
    pub requested: ReserveAmount,
    pub filled_before: ReserveAmount,
    pub filled_after: ReserveAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillMetrics {
    pub total_requested: ReserveAmount,
    pub total_filled: ReserveAmount,
}

#[derive(Debug, Clone, Default)]
pub struct FillTracker {
    records: Vec<FillRecord>,
}

impl FillTracker {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<FillRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FillRecord] {
        &self.records
    }

    pub fn get(&self, position_id: PositionId) -> Option<&FillRecord> {
        self.records.iter().find(|r| r.position_id == position_id)
    }

    pub fn filled_for(&self, position_id: PositionId) -> ReserveAmount {
        self.get(position_id)
            .map(|r| r.filled)
            .unwrap_or_else(ReserveAmount::zero)
    }

    /// Register a new request with zero fill. Apportionment assigns capacity
    /// in a separate step so the caller controls event ordering.
    pub fn register(&mut self, position_id: PositionId, notional: ReserveAmount) {
        debug_assert!(self.get(position_id).is_none(), "duplicate fill record");
        self.records.push(FillRecord {
            position_id,
            requested: notional,
            filled: ReserveAmount::zero(),
        });
    }

    /// Drop a record when its position deactivates. Returns the final state.
    pub fn release(&mut self, position_id: PositionId) -> Option<FillRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.position_id == position_id)?;
        Some(self.records.remove(idx))
    }

    /// Move a single record's fill by `delta`, clamped into [0, requested].
    pub fn adjust(&mut self, position_id: PositionId, delta: Decimal) -> Option<FillAdjustment> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.position_id == position_id)?;

        let before = record.filled;
        let target = ReserveAmount::new(before.value() + delta)
            .max(ReserveAmount::zero())
            .min(record.requested);
        record.filled = target;

        Some(FillAdjustment {
            position_id,
            requested: record.requested,
            filled_before: before,
            filled_after: target,
        })
    }

    /// Re-apportion the backing capacity across all records pro-rata by
    /// requested notional. Called whenever issuance activity moves the
    /// capacity or the request set changes. Returns one adjustment per record
    /// whose fill actually moved.
    pub fn reapportion(&mut self, capacity: ReserveAmount) -> Vec<FillAdjustment> {
        let capacity = capacity.max(ReserveAmount::zero());
        let total_requested: ReserveAmount = self.records.iter().map(|r| r.requested).sum();

        let mut adjustments = Vec::new();
        for record in &mut self.records {
            let target = if total_requested.is_zero() {
                ReserveAmount::zero()
            } else if capacity >= total_requested {
                record.requested
            } else {
                // truncated pro-rata share, so sum(filled) <= capacity
                ReserveAmount::new(
                    capacity.value() * record.requested.value() / total_requested.value(),
                )
                .min(record.requested)
            };

            if target != record.filled {
                adjustments.push(FillAdjustment {
                    position_id: record.position_id,
                    requested: record.requested,
                    filled_before: record.filled,
                    filled_after: target,
                });
                record.filled = target;
            }
        }
        adjustments
    }

    pub fn metrics(&self) -> FillMetrics {
        FillMetrics {
            total_requested: self.records.iter().map(|r| r.requested).sum(),
            total_filled: self.records.iter().map(|r| r.filled).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amt(v: Decimal) -> ReserveAmount {
        ReserveAmount::new(v)
    }

    #[test]
    fn full_capacity_fills_every_request() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(500)));
        tracker.register(PositionId(2), amt(dec!(300)));

        let adjustments = tracker.reapportion(amt(dec!(1000)));
        assert_eq!(adjustments.len(), 2);
        assert_eq!(tracker.filled_for(PositionId(1)), amt(dec!(500)));
        assert_eq!(tracker.filled_for(PositionId(2)), amt(dec!(300)));

        let m = tracker.metrics();
        assert_eq!(m.total_requested, amt(dec!(800)));
        assert_eq!(m.total_filled, amt(dec!(800)));
    }

    #[test]
    fn scarce_capacity_apportions_pro_rata() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(600)));
        tracker.register(PositionId(2), amt(dec!(200)));

        tracker.reapportion(amt(dec!(400)));

        // 400 * 600/800 = 300, 400 * 200/800 = 100
        assert_eq!(tracker.filled_for(PositionId(1)), amt(dec!(300)));
        assert_eq!(tracker.filled_for(PositionId(2)), amt(dec!(100)));
    }

    #[test]
    fn truncated_shares_never_exceed_capacity() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(1)));
        tracker.register(PositionId(2), amt(dec!(1)));
        tracker.register(PositionId(3), amt(dec!(1)));

        tracker.reapportion(amt(dec!(1)));

        let m = tracker.metrics();
        assert!(m.total_filled <= amt(dec!(1)));
        for r in tracker.records() {
            assert!(r.filled <= r.requested);
            assert!(!r.filled.is_negative());
        }
    }

    #[test]
    fn shrinking_capacity_reduces_fills() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(500)));
        tracker.reapportion(amt(dec!(1000)));
        assert_eq!(tracker.filled_for(PositionId(1)), amt(dec!(500)));

        let adjustments = tracker.reapportion(amt(dec!(200)));
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].filled_before, amt(dec!(500)));
        assert_eq!(adjustments[0].filled_after, amt(dec!(200)));
    }

    #[test]
    fn unchanged_fills_produce_no_adjustments() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(500)));
        tracker.reapportion(amt(dec!(1000)));

        let adjustments = tracker.reapportion(amt(dec!(1000)));
        assert!(adjustments.is_empty());
    }

    #[test]
    fn adjust_clamps_to_bounds() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(100)));

        let up = tracker.adjust(PositionId(1), dec!(250)).unwrap();
        assert_eq!(up.filled_after, amt(dec!(100)));

        let down = tracker.adjust(PositionId(1), dec!(-999)).unwrap();
        assert_eq!(down.filled_after, amt(dec!(0)));

        assert!(tracker.adjust(PositionId(9), dec!(1)).is_none());
    }

    #[test]
    fn release_removes_record() {
        let mut tracker = FillTracker::new();
        tracker.register(PositionId(1), amt(dec!(100)));
        tracker.register(PositionId(2), amt(dec!(100)));

        let released = tracker.release(PositionId(1)).unwrap();
        assert_eq!(released.requested, amt(dec!(100)));
        assert!(tracker.get(PositionId(1)).is_none());
        assert_eq!(tracker.records().len(), 1);
    }
}
