// 5.0 position.rs: hedge position struct, PnL, and margin-ratio math.
// pnl = filled * (price - entry) / entry, signed by side. ratio math runs on
// filled notional: exposure that was never backed is never charged or credited.

use crate::types::{AccountId, Bps, Leverage, PositionId, Price, ReserveAmount, Side, Timestamp};
use serde::{Deserialize, Serialize};

/// Position lifecycle. Closed and Liquidated are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Pending,
    Active,
    Closed,
    Liquidated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: AccountId,
    pub side: Side,
    pub margin: ReserveAmount,
    pub notional: ReserveAmount,
    pub leverage: Leverage,
    pub entry_price: Price,
    pub status: PositionStatus,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
    pub realized_pnl: ReserveAmount,
}

impl Position {
    pub fn new(
        id: PositionId,
        owner: AccountId,
        side: Side,
        margin: ReserveAmount,
        leverage: Leverage,
        entry_price: Price,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            side,
            margin,
            notional: margin.mul(leverage.as_decimal()),
            leverage,
            entry_price,
            status: PositionStatus::Pending,
            opened_at: timestamp,
            updated_at: timestamp,
            realized_pnl: ReserveAmount::zero(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    /// Paper gains/losses on the backed fraction of the notional.
    pub fn unrealized_pnl(&self, filled: ReserveAmount, price: Price) -> ReserveAmount {
        calculate_pnl(filled, self.entry_price, price, self.side)
    }

    /// margin + pnl. this vs the maintenance requirement decides liquidation.
    pub fn equity(&self, filled: ReserveAmount, price: Price) -> ReserveAmount {
        self.margin.add(self.unrealized_pnl(filled, price))
    }
}

/// The pnl formula: filled * (price - entry) / entry, signed by side.
pub fn calculate_pnl(
    filled: ReserveAmount,
    entry_price: Price,
    current_price: Price,
    side: Side,
) -> ReserveAmount {
    let move_fraction =
        (current_price.value() - entry_price.value()) / entry_price.value();
    ReserveAmount::new(filled.value() * move_fraction * side.sign())
}

/// Maintenance requirement for the backed exposure.
pub fn maintenance_margin(filled: ReserveAmount, maintenance_margin_bps: Bps) -> ReserveAmount {
    filled.mul(maintenance_margin_bps.as_fraction())
}

/// Margin ratio in bps: equity over the maintenance requirement. None when
/// the position carries no backed exposure, which reads as unbounded health.
pub fn margin_ratio_bps(
    equity: ReserveAmount,
    filled: ReserveAmount,
    maintenance_margin_bps: Bps,
) -> Option<Bps> {
    let maintenance = maintenance_margin(filled, maintenance_margin_bps);
    if !maintenance.is_positive() {
        return None;
    }
    Bps::from_ratio(equity.value(), maintenance.value())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionParams {
    pub min_leverage: u32,
    pub max_leverage: u32,
    /// Maintenance requirement as bps of filled notional.
    pub maintenance_margin_bps: Bps,
    /// Floor on the margin ratio after a margin withdrawal.
    pub min_margin_ratio_bps: Bps,
    /// Ratio below which a position becomes liquidation-eligible.
    pub liquidation_threshold_bps: Bps,
    pub max_positions_per_account: usize,
    /// Share of seized equity paid to the liquidator.
    pub liquidator_reward_bps: Bps,
}

impl Default for PositionParams {
    fn default() -> Self {
        Self {
            min_leverage: 1,
            max_leverage: 10,
            maintenance_margin_bps: Bps::new(500),
            min_margin_ratio_bps: Bps::new(11_000),
            liquidation_threshold_bps: Bps::new(10_500),
            max_positions_per_account: 50,
            liquidator_reward_bps: Bps::new(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn amt(v: Decimal) -> ReserveAmount {
        ReserveAmount::new(v)
    }

    fn test_position(side: Side) -> Position {
        Position::new(
            PositionId(1),
            AccountId(1),
            side,
            amt(dec!(100)),
            Leverage::new(5).unwrap(),
            Price::new_unchecked(dec!(1.08)),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn notional_is_margin_times_leverage() {
        let pos = test_position(Side::Long);
        assert_eq!(pos.notional, amt(dec!(500)));
        assert_eq!(pos.status, PositionStatus::Pending);
    }

    #[test]
    fn long_pnl_on_five_percent_move() {
        let pos = test_position(Side::Long);
        // 1.08 -> 1.134 is +5%; fully filled notional of 500 gains 25
        let pnl = pos.unrealized_pnl(amt(dec!(500)), Price::new_unchecked(dec!(1.134)));
        assert_eq!(pnl.value(), dec!(25));
    }

    #[test]
    fn short_pnl_mirrors_long() {
        let pos = test_position(Side::Short);
        let pnl = pos.unrealized_pnl(amt(dec!(500)), Price::new_unchecked(dec!(1.134)));
        assert_eq!(pnl.value(), dec!(-25));

        let pnl = pos.unrealized_pnl(amt(dec!(500)), Price::new_unchecked(dec!(0.918)));
        assert_eq!(pnl.value(), dec!(75));
    }

    #[test]
    fn unfilled_exposure_earns_nothing() {
        let pos = test_position(Side::Long);
        let pnl = pos.unrealized_pnl(ReserveAmount::zero(), Price::new_unchecked(dec!(1.134)));
        assert!(pnl.is_zero());
    }

    #[test]
    fn partial_fill_scales_pnl() {
        let pos = test_position(Side::Long);
        // only 200 of the 500 notional is backed
        let pnl = pos.unrealized_pnl(amt(dec!(200)), Price::new_unchecked(dec!(1.134)));
        assert_eq!(pnl.value(), dec!(10));
    }

    #[test]
    fn equity_combines_margin_and_pnl() {
        let pos = test_position(Side::Long);
        let equity = pos.equity(amt(dec!(500)), Price::new_unchecked(dec!(0.918)));
        // 100 margin - 75 loss
        assert_eq!(equity.value(), dec!(25));
    }

    #[test]
    fn margin_ratio_against_maintenance() {
        // maintenance = 500 * 5% = 25
        let ratio = margin_ratio_bps(amt(dec!(100)), amt(dec!(500)), Bps::new(500)).unwrap();
        assert_eq!(ratio.value(), 40_000); // 100 / 25

        let ratio = margin_ratio_bps(amt(dec!(25)), amt(dec!(500)), Bps::new(500)).unwrap();
        assert_eq!(ratio.value(), 10_000);

        // at 26.25 equity the ratio sits exactly on a 105% threshold
        let ratio = margin_ratio_bps(amt(dec!(26.25)), amt(dec!(500)), Bps::new(500)).unwrap();
        assert_eq!(ratio.value(), 10_500);
    }

    #[test]
    fn no_backed_exposure_means_no_ratio() {
        assert!(margin_ratio_bps(amt(dec!(100)), ReserveAmount::zero(), Bps::new(500)).is_none());
    }
}
