//! Hedge position lifecycle: open, margin top-up/withdrawal, close.

use super::core::Engine;
use super::results::{ClosePositionResult, EngineError, OpenPositionResult};
use crate::events::{
    BadDebtEvent, EventPayload, MarginChangedEvent, PositionClosedEvent, PositionOpenedEvent,
};
use crate::position::{margin_ratio_bps, Position, PositionStatus};
use crate::types::{AccountId, Leverage, PositionId, ReserveAmount, Side};

impl Engine {
    pub fn open_position(
        &mut self,
        caller: AccountId,
        margin: ReserveAmount,
        leverage: u32,
        side: Side,
    ) -> Result<OpenPositionResult, EngineError> {
        if !margin.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: margin.value(),
            });
        }

        let min_leverage = self.params.positions.min_leverage;
        let max_leverage = self.params.positions.max_leverage;
        let max_positions = self.params.positions.max_positions_per_account;

        let leverage_out_of_range = leverage < min_leverage || leverage > max_leverage;
        let leverage = match Leverage::new(leverage) {
            Some(l) if !leverage_out_of_range => l,
            _ => {
                return Err(EngineError::InvalidLeverage {
                    requested: leverage,
                    min: min_leverage,
                    max: max_leverage,
                })
            }
        };

        let open_count = self
            .accounts
            .get(&caller)
            .ok_or(EngineError::AccountNotFound(caller))?
            .open_position_count();
        if open_count >= max_positions {
            return Err(EngineError::ExceedsLimit {
                value: rust_decimal::Decimal::from(open_count as u64),
                limit: rust_decimal::Decimal::from(max_positions as u64),
            });
        }

        let price = self.usable_price()?;

        let account = self.account_mut(caller)?;
        account.debit_reserve(margin)?;

        let position_id = PositionId(self.next_position_id);
        self.next_position_id += 1;

        let mut position = Position::new(
            position_id,
            caller,
            side,
            margin,
            leverage,
            price,
            self.current_time,
        );
        let notional = position.notional;
        position.status = PositionStatus::Active;

        self.account_mut(caller)?.attach_position(position_id, margin);
        self.positions.insert(position_id, position);
        self.fills.register(position_id, notional);

        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            position_id,
            account_id: caller,
            side,
            margin,
            leverage,
            notional,
            entry_price: price,
        }));
        self.sync_fills();

        Ok(OpenPositionResult {
            position_id,
            notional,
            entry_price: price,
            filled: self.fills.filled_for(position_id),
        })
    }

    pub fn add_margin(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: ReserveAmount,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.value(),
            });
        }
        self.require_active_owned(caller, position_id)?;
        self.usable_price()?;

        self.account_mut(caller)?.debit_reserve(amount)?;

        let position = self.positions.get_mut(&position_id).expect("checked above");
        position.margin = position.margin.add(amount);
        position.updated_at = self.current_time;
        let new_margin = position.margin;

        self.account_mut(caller)?.margin_added(amount);

        self.emit_event(EventPayload::MarginAdded(MarginChangedEvent {
            position_id,
            account_id: caller,
            amount,
            new_margin,
        }));
        Ok(())
    }

    pub fn remove_margin(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: ReserveAmount,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.value(),
            });
        }
        self.require_active_owned(caller, position_id)?;
        let price = self.usable_price()?;

        let position = self.positions.get(&position_id).expect("checked above");
        if amount > position.margin {
            return Err(EngineError::Account(
                crate::account::AccountError::InsufficientBalance {
                    requested: amount.value(),
                    available: position.margin.value(),
                },
            ));
        }

        let filled = self.fills.filled_for(position_id);
        let remaining_margin = position.margin.sub(amount);
        let remaining_equity = remaining_margin.add(position.unrealized_pnl(filled, price));
        let minimum = self.params.positions.min_margin_ratio_bps;

        if let Some(resulting) = margin_ratio_bps(
            remaining_equity,
            filled,
            self.params.positions.maintenance_margin_bps,
        ) {
            if resulting < minimum {
                return Err(EngineError::MarginBelowMinimum { resulting, minimum });
            }
        }

        let position = self.positions.get_mut(&position_id).expect("checked above");
        position.margin = remaining_margin;
        position.updated_at = self.current_time;
        let new_margin = position.margin;

        let account = self.account_mut(caller)?;
        account.margin_removed(amount);
        account.credit_reserve(amount);

        self.emit_event(EventPayload::MarginRemoved(MarginChangedEvent {
            position_id,
            account_id: caller,
            amount,
            new_margin,
        }));
        Ok(())
    }

    pub fn close_position(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
    ) -> Result<ClosePositionResult, EngineError> {
        self.require_active_owned(caller, position_id)?;
        let price = self.usable_price()?;

        let (margin, pnl) = {
            let position = self.positions.get(&position_id).expect("checked above");
            let filled = self.fills.filled_for(position_id);
            (position.margin, position.unrealized_pnl(filled, price))
        };

        let (settled_pnl, bad_debt) = self.settle_pnl(position_id, caller, pnl, margin);
        let margin_returned = margin.add(settled_pnl).max(ReserveAmount::zero());

        let position = self.positions.get_mut(&position_id).expect("checked above");
        position.status = PositionStatus::Closed;
        position.realized_pnl = settled_pnl;
        position.updated_at = self.current_time;

        let account = self.account_mut(caller)?;
        account.credit_reserve(margin_returned);
        account.realize_pnl(settled_pnl);
        account.detach_position(position_id, margin);

        self.fills.release(position_id);

        if let Some(event) = bad_debt {
            self.emit_event(EventPayload::BadDebt(event));
        }
        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            position_id,
            account_id: caller,
            exit_price: price,
            realized_pnl: settled_pnl,
            margin_returned,
        }));
        self.sync_fills();

        Ok(ClosePositionResult {
            realized_pnl: settled_pnl,
            margin_returned,
            exit_price: price,
        })
    }

    /// Owner-only, active-only guard shared by the margin and close paths.
    pub(super) fn require_active_owned(
        &self,
        caller: AccountId,
        position_id: PositionId,
    ) -> Result<(), EngineError> {
        let position = self
            .positions
            .get(&position_id)
            .filter(|p| p.is_active())
            .ok_or(EngineError::PositionNotActive(position_id))?;
        if position.owner != caller {
            return Err(EngineError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Settle a position's PnL leg against the vault. Profits draw from the
    /// issuance reserves, then the insurance fund; losses flow into the
    /// reserves, capped at the position's margin. The uncapped remainder of a
    /// loss is bad debt, covered by the insurance fund where possible.
    /// Returns the settled PnL (what the position actually pays or receives)
    /// and the bad-debt record if one arose.
    pub(super) fn settle_pnl(
        &mut self,
        position_id: PositionId,
        owner: AccountId,
        pnl: ReserveAmount,
        margin: ReserveAmount,
    ) -> (ReserveAmount, Option<BadDebtEvent>) {
        if pnl.is_positive() {
            let from_vault = pnl.min(self.vault.reserve_balance);
            self.vault.reserve_balance = self.vault.reserve_balance.sub(from_vault);

            let remainder = pnl.sub(from_vault);
            let from_insurance = if remainder.is_positive() {
                self.insurance_fund.cover_bad_debt(remainder)
            } else {
                ReserveAmount::zero()
            };

            self.vault.last_update = self.current_time;
            (from_vault.add(from_insurance), None)
        } else if pnl.is_negative() {
            let loss = pnl.abs();
            let absorbed = loss.min(margin);
            self.vault.reserve_balance = self.vault.reserve_balance.add(absorbed);

            let shortfall = loss.sub(absorbed);
            let bad_debt = if shortfall.is_positive() {
                let covered = self.insurance_fund.cover_bad_debt(shortfall);
                self.vault.reserve_balance = self.vault.reserve_balance.add(covered);
                Some(BadDebtEvent {
                    position_id,
                    account_id: owner,
                    debt_amount: shortfall,
                    covered_by_insurance: covered,
                    uncovered: shortfall.sub(covered),
                })
            } else {
                None
            };

            self.vault.last_update = self.current_time;
            (absorbed.negate(), bad_debt)
        } else {
            (ReserveAmount::zero(), None)
        }
    }
}
