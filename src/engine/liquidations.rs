//! Liquidation of undercollateralized hedge positions.
//!
//! Liquidation is racy by design across callers. The active-status check at
//! the top of the operation is what guarantees at most one seizure per
//! position: the first success flips the status to Liquidated, so a second
//! attempt fails with PositionNotActive.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult};
use crate::access::Role;
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::position::{margin_ratio_bps, PositionStatus};
use crate::types::{AccountId, PositionId, ReserveAmount};
use serde::{Deserialize, Serialize};

/// Backstop capital. Collects the non-reward share of seized equity and
/// covers bad debt when a position's loss exceeds its margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceFund {
    pub balance: ReserveAmount,
    pub total_deposits: ReserveAmount,
    pub total_payouts: ReserveAmount,
}

impl InsuranceFund {
    pub fn new() -> Self {
        Self {
            balance: ReserveAmount::zero(),
            total_deposits: ReserveAmount::zero(),
            total_payouts: ReserveAmount::zero(),
        }
    }

    pub fn deposit(&mut self, amount: ReserveAmount) {
        self.balance = self.balance.add(amount);
        self.total_deposits = self.total_deposits.add(amount);
    }

    /// Pay out up to the available balance. Returns what was covered.
    pub fn cover_bad_debt(&mut self, amount: ReserveAmount) -> ReserveAmount {
        let covered = amount.min(self.balance);
        self.balance = self.balance.sub(covered);
        self.total_payouts = self.total_payouts.add(covered);
        covered
    }
}

impl Default for InsuranceFund {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn liquidate_position(
        &mut self,
        liquidator: AccountId,
        position_id: PositionId,
    ) -> Result<LiquidationResult, EngineError> {
        self.require_role(liquidator, Role::Liquidator)?;
        if !self.accounts.contains_key(&liquidator) {
            return Err(EngineError::AccountNotFound(liquidator));
        }

        let position = self
            .positions
            .get(&position_id)
            .filter(|p| p.is_active())
            .ok_or(EngineError::PositionNotActive(position_id))?;
        let owner = position.owner;
        let margin = position.margin;

        let price = self.usable_price()?;
        let filled = self.fills.filled_for(position_id);
        let pnl = self
            .positions
            .get(&position_id)
            .expect("checked above")
            .unrealized_pnl(filled, price);
        let equity = margin.add(pnl);

        let threshold = self.params.positions.liquidation_threshold_bps;
        let ratio = margin_ratio_bps(
            equity,
            filled,
            self.params.positions.maintenance_margin_bps,
        );
        let ratio = match ratio {
            Some(r) if r < threshold => r,
            other => {
                return Err(EngineError::PositionHealthy {
                    ratio: other,
                    threshold,
                })
            }
        };

        let (settled_pnl, bad_debt_event) = self.settle_pnl(position_id, owner, pnl, margin);
        let seized = margin.add(settled_pnl).max(ReserveAmount::zero());

        let reward = seized.mul(self.params.positions.liquidator_reward_bps.as_fraction());
        let to_insurance = seized.sub(reward);
        self.insurance_fund.deposit(to_insurance);
        self.account_mut(liquidator)?.credit_reserve(reward);

        let position = self.positions.get_mut(&position_id).expect("checked above");
        position.status = PositionStatus::Liquidated;
        position.realized_pnl = margin.negate();
        position.updated_at = self.current_time;

        let owner_account = self.account_mut(owner)?;
        owner_account.realize_pnl(margin.negate());
        owner_account.detach_position(position_id, margin);

        self.fills.release(position_id);

        let bad_debt = bad_debt_event
            .as_ref()
            .map(|e| e.debt_amount)
            .unwrap_or_else(ReserveAmount::zero);
        if let Some(event) = bad_debt_event {
            self.emit_event(EventPayload::BadDebt(event));
        }
        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            position_id,
            account_id: owner,
            liquidator,
            price,
            margin_ratio_bps: ratio,
            seized,
            liquidator_reward: reward,
        }));
        self.sync_fills();

        Ok(LiquidationResult {
            position_id,
            owner,
            seized,
            liquidator_reward: reward,
            bad_debt,
            price,
        })
    }
}
