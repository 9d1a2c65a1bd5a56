//! Caller accounts and balance management.
//!
//! Accounts hold a reserve-asset balance (deposits, margin source, redemption
//! proceeds) and a synthetic balance (minted units). Margin posted to open
//! positions leaves the reserve balance and is tracked per position; the
//! account keeps the aggregate so solvency math can see it.

use crate::types::{AccountId, PositionId, ReserveAmount, SyntheticAmount, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub reserve_balance: ReserveAmount,
    pub synthetic_balance: SyntheticAmount,
    pub position_ids: BTreeSet<PositionId>,
    pub total_margin: ReserveAmount,
    pub total_deposited: ReserveAmount,
    pub total_withdrawn: ReserveAmount,
    pub realized_pnl: ReserveAmount,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, timestamp: Timestamp) -> Self {
        Self {
            id,
            reserve_balance: ReserveAmount::zero(),
            synthetic_balance: SyntheticAmount::zero(),
            position_ids: BTreeSet::new(),
            total_margin: ReserveAmount::zero(),
            total_deposited: ReserveAmount::zero(),
            total_withdrawn: ReserveAmount::zero(),
            realized_pnl: ReserveAmount::zero(),
            created_at: timestamp,
        }
    }

    pub fn deposit_reserve(&mut self, amount: ReserveAmount) {
        self.reserve_balance = self.reserve_balance.add(amount);
        self.total_deposited = self.total_deposited.add(amount);
    }

    pub fn withdraw_reserve(&mut self, amount: ReserveAmount) -> Result<(), AccountError> {
        self.debit_reserve(amount)?;
        self.total_withdrawn = self.total_withdrawn.add(amount);
        Ok(())
    }

    pub fn debit_reserve(&mut self, amount: ReserveAmount) -> Result<(), AccountError> {
        if amount > self.reserve_balance {
            return Err(AccountError::InsufficientBalance {
                requested: amount.value(),
                available: self.reserve_balance.value(),
            });
        }
        self.reserve_balance = self.reserve_balance.sub(amount);
        Ok(())
    }

    pub fn credit_reserve(&mut self, amount: ReserveAmount) {
        self.reserve_balance = self.reserve_balance.add(amount);
    }

    pub fn credit_synthetic(&mut self, amount: SyntheticAmount) {
        self.synthetic_balance = self.synthetic_balance.add(amount);
    }

    pub fn debit_synthetic(&mut self, amount: SyntheticAmount) -> Result<(), AccountError> {
        if amount > self.synthetic_balance {
            return Err(AccountError::InsufficientBalance {
                requested: amount.value(),
                available: self.synthetic_balance.value(),
            });
        }
        self.synthetic_balance = self.synthetic_balance.sub(amount);
        Ok(())
    }

    pub fn realize_pnl(&mut self, pnl: ReserveAmount) {
        self.realized_pnl = self.realized_pnl.add(pnl);
    }

    pub fn open_position_count(&self) -> usize {
        self.position_ids.len()
    }

    /// Track a freshly opened position and the margin that moved into it.
    pub fn attach_position(&mut self, position_id: PositionId, margin: ReserveAmount) {
        self.position_ids.insert(position_id);
        self.total_margin = self.total_margin.add(margin);
    }

    /// Forget a deactivated position. `margin` is the margin amount still
    /// booked against it at deactivation time.
    pub fn detach_position(&mut self, position_id: PositionId, margin: ReserveAmount) {
        self.position_ids.remove(&position_id);
        self.total_margin = self.total_margin.sub(margin);
    }

    pub fn margin_added(&mut self, amount: ReserveAmount) {
        self.total_margin = self.total_margin.add(amount);
    }

    pub fn margin_removed(&mut self, amount: ReserveAmount) {
        self.total_margin = self.total_margin.sub(amount);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
}
