// 7.0: every state change produces an event. used for audit trails, downstream
// reconciliation, and notifying external indexers. the EventPayload enum lists
// all event types.

use crate::access::Role;
use crate::fills::FillAdjustment;
use crate::types::{
    AccountId, Bps, Leverage, PositionId, Price, ReserveAmount, Side, SyntheticAmount, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Issuance events
    Minted(MintedEvent),
    Redeemed(RedeemedEvent),
    FeesCollected(FeesCollectedEvent),

    // Account events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),
    MarginAdded(MarginChangedEvent),
    MarginRemoved(MarginChangedEvent),
    BadDebt(BadDebtEvent),

    // Fill events
    FillAdjusted(FillAdjustment),

    // Oracle events
    PriceBoundsUpdated(PriceBoundsUpdatedEvent),
    FeedReferenceUpdated(FeedReferenceUpdatedEvent),
    CircuitBreakerTriggered(CircuitBreakerEvent),
    CircuitBreakerReset(CircuitBreakerEvent),

    // Access events
    RoleGranted(RoleChangedEvent),
    RoleRevoked(RoleChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedEvent {
    pub account_id: AccountId,
    pub reserve_in: ReserveAmount,
    pub synthetic_out: SyntheticAmount,
    pub fee: ReserveAmount,
    pub price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemedEvent {
    pub account_id: AccountId,
    pub synthetic_in: SyntheticAmount,
    pub reserve_out: ReserveAmount,
    pub fee: ReserveAmount,
    pub price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesCollectedEvent {
    pub account_id: AccountId,
    pub amount: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub account_id: AccountId,
    pub amount: ReserveAmount,
    pub new_balance: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub account_id: AccountId,
    pub amount: ReserveAmount,
    pub new_balance: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub account_id: AccountId,
    pub amount: ReserveAmount,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub position_id: PositionId,
    pub account_id: AccountId,
    pub side: Side,
    pub margin: ReserveAmount,
    pub leverage: Leverage,
    pub notional: ReserveAmount,
    pub entry_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub position_id: PositionId,
    pub account_id: AccountId,
    pub exit_price: Price,
    pub realized_pnl: ReserveAmount,
    pub margin_returned: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub position_id: PositionId,
    pub account_id: AccountId,
    pub liquidator: AccountId,
    pub price: Price,
    pub margin_ratio_bps: Bps,
    pub seized: ReserveAmount,
    pub liquidator_reward: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginChangedEvent {
    pub position_id: PositionId,
    pub account_id: AccountId,
    pub amount: ReserveAmount,
    pub new_margin: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub position_id: PositionId,
    pub account_id: AccountId,
    pub debt_amount: ReserveAmount,
    pub covered_by_insurance: ReserveAmount,
    pub uncovered: ReserveAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBoundsUpdatedEvent {
    pub min_bound: Decimal,
    pub max_bound: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedReferenceUpdatedEvent {
    pub source_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerEvent {
    pub by: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangedEvent {
    pub account_id: AccountId,
    pub role: Role,
}
