// 10.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::oracle::OracleError;
use crate::position::Position;
use crate::types::{AccountId, Bps, PositionId, Price, ReserveAmount, SyntheticAmount};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct MintResult {
    pub synthetic_out: SyntheticAmount,
    pub fee: ReserveAmount,
    pub price: Price,
}

#[derive(Debug, Clone)]
pub struct RedeemResult {
    pub reserve_out: ReserveAmount,
    pub fee: ReserveAmount,
    pub price: Price,
}

#[derive(Debug, Clone)]
pub struct OpenPositionResult {
    pub position_id: PositionId,
    pub notional: ReserveAmount,
    pub entry_price: Price,
    /// Fill granted immediately out of current backing capacity.
    pub filled: ReserveAmount,
}

#[derive(Debug, Clone)]
pub struct ClosePositionResult {
    pub realized_pnl: ReserveAmount,
    pub margin_returned: ReserveAmount,
    pub exit_price: Price,
}

#[derive(Debug, Clone)]
pub struct LiquidationResult {
    pub position_id: PositionId,
    pub owner: AccountId,
    pub seized: ReserveAmount,
    pub liquidator_reward: ReserveAmount,
    pub bad_debt: ReserveAmount,
    pub price: Price,
}

/// Read-surface view of one position. PnL and ratio are absent while no
/// usable price exists; the read itself never fails on oracle state.
#[derive(Debug, Clone)]
pub struct PositionInfo {
    pub position: Position,
    pub filled: ReserveAmount,
    pub unrealized_pnl: Option<ReserveAmount>,
    pub margin_ratio_bps: Option<Bps>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("unauthorized access by account {caller:?}")]
    Unauthorized { caller: AccountId },

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid leverage {requested}: allowed {min}..={max}")]
    InvalidLeverage { requested: u32, min: u32, max: u32 },

    #[error("collateralization {resulting} would fall below minimum {minimum}")]
    InsufficientCollateralization { resulting: Bps, minimum: Bps },

    #[error("margin ratio {resulting} would fall below minimum {minimum}")]
    MarginBelowMinimum { resulting: Bps, minimum: Bps },

    #[error("position {0:?} is not active")]
    PositionNotActive(PositionId),

    #[error("position is healthy: margin ratio {ratio:?} above threshold {threshold}")]
    PositionHealthy { ratio: Option<Bps>, threshold: Bps },

    #[error("amount {value} exceeds limit {limit}")]
    ExceedsLimit { value: Decimal, limit: Decimal },

    #[error("amount {value} below minimum {minimum}")]
    BelowMinimum { value: Decimal, minimum: Decimal },

    #[error("slippage exceeded: output {actual} below minimum {minimum}")]
    SlippageExceeded { actual: Decimal, minimum: Decimal },

    #[error("account {0:?} not found")]
    AccountNotFound(AccountId),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("account error: {0}")]
    Account(#[from] AccountError),
}
