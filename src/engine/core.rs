// 10.1 engine/core.rs: main engine. owns every component, the account map, the
// role registry, the event buffer and the clock. entry points follow
// checks-effects-events ordering: validate roles and inputs, read the price
// gate fresh, mutate local state, then push events. no operation calls out
// mid-flight.

use super::config::EngineConfig;
use super::liquidations::InsuranceFund;
use super::results::{EngineError, PositionInfo};
use crate::access::{Role, RoleRegistry};
use crate::account::Account;
use crate::config::EngineParams;
use crate::events::{
    CircuitBreakerEvent, DepositEvent, Event, EventId, EventPayload, FeedReferenceUpdatedEvent,
    FeesCollectedEvent, PriceBoundsUpdatedEvent, RoleChangedEvent, WithdrawalEvent,
    WithdrawalRejectedEvent,
};
use crate::fills::{FillMetrics, FillTracker};
use crate::oracle::{PriceGate, PriceSource, PriceStatus};
use crate::position::{margin_ratio_bps, Position};
use crate::snapshot::{migrate, EngineSnapshot, PriceGateState, SnapshotError, SNAPSHOT_VERSION};
use crate::types::{AccountId, PositionId, Price, ReserveAmount, Timestamp};
use crate::vault::{collateral_ratio_bps, utilization_bps, VaultMetrics, VaultState};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) params: EngineParams,
    pub(super) oracle: PriceGate,
    pub(super) vault: VaultState,
    pub(super) fills: FillTracker,
    pub(super) positions: HashMap<PositionId, Position>,
    pub(super) accounts: HashMap<AccountId, Account>,
    pub(super) roles: RoleRegistry,
    pub(super) insurance_fund: InsuranceFund,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_position_id: u64,
    pub(super) next_account_id: u64,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig, params: EngineParams, source: Box<dyn PriceSource>) -> Self {
        let oracle = PriceGate::new(source, &params.oracle);
        Self {
            config,
            params,
            oracle,
            vault: VaultState::new(Timestamp::from_millis(0)),
            fills: FillTracker::new(),
            positions: HashMap::new(),
            accounts: HashMap::new(),
            roles: RoleRegistry::new(),
            insurance_fund: InsuranceFund::new(),
            events: Vec::new(),
            next_event_id: 1,
            next_position_id: 1,
            next_account_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    // ---- accounts ----

    pub fn create_account(&mut self) -> AccountId {
        let id = AccountId(self.next_account_id);
        self.next_account_id += 1;
        self.accounts.insert(id, Account::new(id, self.current_time));
        id
    }

    pub fn get_account(&self, account_id: AccountId) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    pub(super) fn account_mut(
        &mut self,
        account_id: AccountId,
    ) -> Result<&mut Account, EngineError> {
        self.accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))
    }

    pub fn deposit_reserve(
        &mut self,
        account_id: AccountId,
        amount: ReserveAmount,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.value(),
            });
        }
        let account = self.account_mut(account_id)?;
        account.deposit_reserve(amount);
        let new_balance = account.reserve_balance;

        self.emit_event(EventPayload::Deposit(DepositEvent {
            account_id,
            amount,
            new_balance,
        }));
        Ok(())
    }

    pub fn withdraw_reserve(
        &mut self,
        account_id: AccountId,
        amount: ReserveAmount,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.value(),
            });
        }
        let account = self.account_mut(account_id)?;
        if let Err(e) = account.withdraw_reserve(amount) {
            let reason = e.to_string();
            self.emit_event(EventPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                account_id,
                amount,
                reason,
            }));
            return Err(EngineError::Account(e));
        }
        let new_balance = account.reserve_balance;

        self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
            account_id,
            amount,
            new_balance,
        }));
        Ok(())
    }

    /// Seed the insurance fund out of the caller's reserve balance.
    pub fn fund_insurance(
        &mut self,
        caller: AccountId,
        amount: ReserveAmount,
    ) -> Result<(), EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: amount.value(),
            });
        }
        let account = self.account_mut(caller)?;
        account.debit_reserve(amount)?;
        self.insurance_fund.deposit(amount);
        Ok(())
    }

    pub fn insurance_fund_balance(&self) -> ReserveAmount {
        self.insurance_fund.balance
    }

    // ---- roles ----

    /// First admin grant. Only valid while no admin exists yet; everything
    /// after goes through `grant_role`.
    pub fn bootstrap_admin(&mut self, account_id: AccountId) -> Result<(), EngineError> {
        if self.roles.any_holder_of(Role::Admin) {
            return Err(EngineError::InvalidParameter("admin already bootstrapped"));
        }
        if !self.accounts.contains_key(&account_id) {
            return Err(EngineError::AccountNotFound(account_id));
        }
        self.roles.grant(account_id, Role::Admin);
        self.emit_event(EventPayload::RoleGranted(RoleChangedEvent {
            account_id,
            role: Role::Admin,
        }));
        Ok(())
    }

    pub fn grant_role(
        &mut self,
        caller: AccountId,
        account_id: AccountId,
        role: Role,
    ) -> Result<(), EngineError> {
        self.require_role(caller, Role::Admin)?;
        if !self.accounts.contains_key(&account_id) {
            return Err(EngineError::AccountNotFound(account_id));
        }
        if self.roles.grant(account_id, role) {
            self.emit_event(EventPayload::RoleGranted(RoleChangedEvent {
                account_id,
                role,
            }));
        }
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: AccountId,
        account_id: AccountId,
        role: Role,
    ) -> Result<(), EngineError> {
        self.require_role(caller, Role::Admin)?;
        if self.roles.revoke(account_id, role) {
            self.emit_event(EventPayload::RoleRevoked(RoleChangedEvent {
                account_id,
                role,
            }));
        }
        Ok(())
    }

    pub fn has_role(&self, account_id: AccountId, role: Role) -> bool {
        self.roles.has(account_id, role)
    }

    pub(super) fn require_role(
        &self,
        caller: AccountId,
        role: Role,
    ) -> Result<(), EngineError> {
        if self.roles.has(caller, role) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized { caller })
        }
    }

    // ---- oracle administration ----

    pub fn update_price_bounds(
        &mut self,
        caller: AccountId,
        min: Decimal,
        max: Decimal,
    ) -> Result<(), EngineError> {
        self.require_role(caller, Role::Admin)?;
        if min >= max {
            return Err(EngineError::InvalidParameter("min bound must be below max"));
        }
        if min <= Decimal::ZERO {
            return Err(EngineError::InvalidParameter("min bound must be positive"));
        }
        self.oracle.set_bounds(min, max);
        self.emit_event(EventPayload::PriceBoundsUpdated(PriceBoundsUpdatedEvent {
            min_bound: min,
            max_bound: max,
        }));
        Ok(())
    }

    pub fn update_feed_reference(
        &mut self,
        caller: AccountId,
        source: Box<dyn PriceSource>,
    ) -> Result<(), EngineError> {
        self.require_role(caller, Role::Admin)?;
        let source_name = source.name().to_string();
        self.oracle.set_source(source);
        self.emit_event(EventPayload::FeedReferenceUpdated(
            FeedReferenceUpdatedEvent { source_name },
        ));
        Ok(())
    }

    pub fn trigger_circuit_breaker(&mut self, caller: AccountId) -> Result<(), EngineError> {
        self.require_role(caller, Role::Emergency)?;
        self.oracle.trigger_breaker();
        self.emit_event(EventPayload::CircuitBreakerTriggered(CircuitBreakerEvent {
            by: caller,
        }));
        Ok(())
    }

    pub fn reset_circuit_breaker(&mut self, caller: AccountId) -> Result<(), EngineError> {
        self.require_role(caller, Role::Admin)?;
        self.oracle.reset_breaker();
        self.emit_event(EventPayload::CircuitBreakerReset(CircuitBreakerEvent {
            by: caller,
        }));
        Ok(())
    }

    // ---- fees ----

    /// Drain the vault fee drawer to the caller. The yield-redistribution
    /// machinery lives outside the engine; this is the seam it pulls on.
    pub fn collect_fees(&mut self, caller: AccountId) -> Result<ReserveAmount, EngineError> {
        self.require_role(caller, Role::YieldManager)?;
        let drawn = self.vault.draw_fees(self.current_time);
        if drawn.is_positive() {
            let account = self.account_mut(caller)?;
            account.credit_reserve(drawn);
            self.emit_event(EventPayload::FeesCollected(FeesCollectedEvent {
                account_id: caller,
                amount: drawn,
            }));
        }
        Ok(drawn)
    }

    // ---- read surface ----

    pub fn price_status(&self) -> PriceStatus {
        self.oracle.status(self.current_time)
    }

    pub fn vault_metrics(&self) -> VaultMetrics {
        let price = self.oracle.current_price(self.current_time).ok();
        let backing = self.collateral_backing();
        VaultMetrics {
            reserve_balance: self.vault.reserve_balance,
            synthetic_supply: self.vault.synthetic_supply,
            accrued_fees: self.vault.accrued_fees,
            collateral_ratio_bps: price
                .and_then(|p| collateral_ratio_bps(backing, self.vault.synthetic_supply, p)),
            utilization_bps: price
                .and_then(|p| utilization_bps(backing, self.vault.synthetic_supply, p)),
        }
    }

    pub fn fill_metrics(&self) -> FillMetrics {
        self.fills.metrics()
    }

    pub fn position_info(&self, position_id: PositionId) -> Option<PositionInfo> {
        let position = self.positions.get(&position_id)?;
        let filled = self.fills.filled_for(position_id);
        let price = self.oracle.current_price(self.current_time).ok();

        let unrealized_pnl = price.map(|p| position.unrealized_pnl(filled, p));
        let ratio = price.and_then(|p| {
            margin_ratio_bps(
                position.equity(filled, p),
                filled,
                self.params.positions.maintenance_margin_bps,
            )
        });

        Some(PositionInfo {
            position: position.clone(),
            filled,
            unrealized_pnl,
            margin_ratio_bps: ratio,
        })
    }

    pub fn active_position_ids(&self) -> Vec<PositionId> {
        let mut ids: Vec<PositionId> = self
            .positions
            .values()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    // ---- shared internals ----

    pub(super) fn usable_price(&self) -> Result<Price, EngineError> {
        Ok(self.oracle.current_price(self.current_time)?)
    }

    /// Everything held against outstanding supply: issuance reserves plus the
    /// margin posted into active hedge positions.
    pub(super) fn collateral_backing(&self) -> ReserveAmount {
        let margin: ReserveAmount = self
            .positions
            .values()
            .filter(|p| p.is_active())
            .map(|p| p.margin)
            .sum();
        self.vault.reserve_balance.add(margin)
    }

    /// Re-apportion fill capacity after issuance activity and emit one event
    /// per record that moved.
    pub(super) fn sync_fills(&mut self) {
        let capacity = self.vault.reserve_balance;
        let adjustments = self.fills.reapportion(capacity);
        for adjustment in adjustments {
            self.emit_event(EventPayload::FillAdjusted(adjustment));
        }
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    // ---- persistence ----

    pub fn snapshot(&self) -> EngineSnapshot {
        let (min_bound, max_bound) = self.oracle.bounds();

        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by_key(|p| p.id);

        let mut accounts: Vec<Account> = self.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);

        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            vault: self.vault.clone(),
            price: PriceGateState {
                min_bound,
                max_bound,
                circuit_broken: self.oracle.is_broken(),
            },
            positions,
            fills: self.fills.records().to_vec(),
            accounts,
            roles: self.roles.export(),
            insurance: self.insurance_fund.clone(),
            next_position_id: self.next_position_id,
            next_event_id: self.next_event_id,
            current_time: self.current_time,
        }
    }

    /// Rebuild an engine from a snapshot, migrating older layouts first. The
    /// feed reference is live state and is injected fresh.
    pub fn restore(
        config: EngineConfig,
        params: EngineParams,
        source: Box<dyn PriceSource>,
        snapshot: EngineSnapshot,
    ) -> Result<Self, SnapshotError> {
        let snapshot = migrate(snapshot)?;

        let mut oracle = PriceGate::new(source, &params.oracle);
        oracle.set_bounds(snapshot.price.min_bound, snapshot.price.max_bound);
        if snapshot.price.circuit_broken {
            oracle.trigger_breaker();
        }

        let next_account_id = snapshot
            .accounts
            .iter()
            .map(|a| a.id.0)
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            config,
            params,
            oracle,
            vault: snapshot.vault,
            fills: FillTracker::from_records(snapshot.fills),
            positions: snapshot
                .positions
                .into_iter()
                .map(|p| (p.id, p))
                .collect(),
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|a| (a.id, a))
                .collect(),
            roles: RoleRegistry::import(snapshot.roles),
            insurance_fund: snapshot.insurance,
            events: Vec::new(),
            next_event_id: snapshot.next_event_id,
            next_position_id: snapshot.next_position_id,
            next_account_id,
            current_time: snapshot.current_time,
        })
    }
}
