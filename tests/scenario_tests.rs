//! End-to-end scenarios: issuance round trips, hedge PnL, liquidation
//! lifecycle, oracle failure modes, capability gating, and persistence.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_core::*;

fn build_engine(price: Decimal) -> (Engine, AccountId) {
    let source = MockPriceSource::new("test-feed", price, Timestamp::from_millis(0));
    let mut engine = Engine::new(
        EngineConfig::default(),
        EngineParams::default(),
        Box::new(source),
    );
    let admin = engine.create_account();
    engine.bootstrap_admin(admin).unwrap();
    (engine, admin)
}

fn set_price(engine: &mut Engine, admin: AccountId, value: Decimal) {
    let source = MockPriceSource::new("test-feed", value, engine.time());
    engine.update_feed_reference(admin, Box::new(source)).unwrap();
}

fn funded_account(engine: &mut Engine, amount: Decimal) -> AccountId {
    let id = engine.create_account();
    engine
        .deposit_reserve(id, ReserveAmount::new(amount))
        .unwrap();
    id
}

/// Scenario A: mint 1,000 reserve at 1.08, redeem the exact synthetic back
/// at the same price, and end up with no more than the original reserve.
#[test]
fn issuance_round_trip_at_constant_price() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let alice = funded_account(&mut engine, dec!(10_000));

    let minted = engine
        .mint(alice, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    // 1000 * 1.08 * (1 - 0.001) = 1078.92
    assert_eq!(minted.synthetic_out.value(), dec!(1078.92));
    assert_eq!(minted.fee.value(), dec!(1));

    let redeemed = engine
        .redeem(alice, minted.synthetic_out, ReserveAmount::zero())
        .unwrap();
    assert!(redeemed.reserve_out.value() <= dec!(1000));

    let account = engine.get_account(alice).unwrap();
    assert!(account.synthetic_balance.is_zero());
    assert!(account.reserve_balance.value() < dec!(10_000));
}

#[test]
fn mint_boundaries() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let alice = funded_account(&mut engine, dec!(20_000_000));

    // one micro-unit under the minimum
    let below = engine.mint(
        alice,
        ReserveAmount::new(dec!(9.999999)),
        SyntheticAmount::zero(),
    );
    assert!(matches!(below, Err(EngineError::BelowMinimum { .. })));

    // one micro-unit over the maximum
    let above = engine.mint(
        alice,
        ReserveAmount::new(dec!(10_000_000.000001)),
        SyntheticAmount::zero(),
    );
    assert!(matches!(above, Err(EngineError::ExceedsLimit { .. })));

    // exactly on the bounds passes
    engine
        .mint(alice, ReserveAmount::new(dec!(10)), SyntheticAmount::zero())
        .unwrap();
    engine
        .mint(
            alice,
            ReserveAmount::new(dec!(10_000_000)),
            SyntheticAmount::zero(),
        )
        .unwrap();
}

#[test]
fn redeem_slippage_guard() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let alice = funded_account(&mut engine, dec!(10_000));

    let minted = engine
        .mint(alice, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let result = engine.redeem(
        alice,
        minted.synthetic_out,
        ReserveAmount::new(dec!(999)),
    );
    assert!(matches!(result, Err(EngineError::SlippageExceeded { .. })));

    // nothing moved on the failed attempt
    let account = engine.get_account(alice).unwrap();
    assert_eq!(account.synthetic_balance, minted.synthetic_out);
}

/// Scenario B: margin 100 at 5x (notional 500) opened at 1.08; a +5% move to
/// 1.134 shows +25 unrealized PnL on the filled notional.
#[test]
fn hedge_pnl_on_five_percent_move() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(5000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let bob = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(bob, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();
    assert_eq!(opened.notional.value(), dec!(500));
    assert_eq!(opened.filled.value(), dec!(500));

    set_price(&mut engine, admin, dec!(1.134));

    let info = engine.position_info(opened.position_id).unwrap();
    assert_eq!(info.unrealized_pnl.unwrap().value(), dec!(25));
    // equity 125 over maintenance 25
    assert_eq!(info.margin_ratio_bps.unwrap().value(), 50_000);
}

/// Scenario C: the ratio drifts below the 105% threshold; liquidation
/// succeeds exactly once.
#[test]
fn liquidation_succeeds_exactly_once() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(5000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let carol = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(carol, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    let keeper = engine.create_account();
    engine.grant_role(admin, keeper, Role::Liquidator).unwrap();

    // equity 25 against maintenance 25: ratio 100% < 105%
    set_price(&mut engine, admin, dec!(0.918));
    let info = engine.position_info(opened.position_id).unwrap();
    assert_eq!(info.margin_ratio_bps.unwrap().value(), 10_000);

    let first = engine.liquidate_position(keeper, opened.position_id);
    assert!(first.is_ok());

    let second = engine.liquidate_position(keeper, opened.position_id);
    assert!(matches!(second, Err(EngineError::PositionNotActive(_))));

    // the owner's margin is gone, once
    let carol_account = engine.get_account(carol).unwrap();
    assert_eq!(carol_account.reserve_balance.value(), dec!(900));
    assert_eq!(carol_account.realized_pnl.value(), dec!(-100));
}

#[test]
fn liquidating_healthy_position_rejected() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(5000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let carol = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(carol, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    let keeper = engine.create_account();
    engine.grant_role(admin, keeper, Role::Liquidator).unwrap();

    let result = engine.liquidate_position(keeper, opened.position_id);
    assert!(matches!(result, Err(EngineError::PositionHealthy { .. })));
}

/// Scenario D: a stale feed blocks every mutating operation while the read
/// surface keeps answering.
#[test]
fn stale_price_blocks_mutations_not_reads() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(5000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let hedger = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(hedger, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    let keeper = engine.create_account();
    engine.grant_role(admin, keeper, Role::Liquidator).unwrap();

    engine.advance_time(300_001);

    let stale = |e: &EngineError| {
        matches!(e, EngineError::Oracle(OracleError::StalePrice { .. }))
    };

    let err = engine
        .mint(minter, ReserveAmount::new(dec!(100)), SyntheticAmount::zero())
        .unwrap_err();
    assert!(stale(&err));

    let err = engine
        .redeem(minter, SyntheticAmount::new(dec!(100)), ReserveAmount::zero())
        .unwrap_err();
    assert!(stale(&err));

    let err = engine
        .open_position(hedger, ReserveAmount::new(dec!(50)), 2, Side::Long)
        .unwrap_err();
    assert!(stale(&err));

    let err = engine
        .liquidate_position(keeper, opened.position_id)
        .unwrap_err();
    assert!(stale(&err));

    // reads still succeed
    let metrics = engine.vault_metrics();
    assert_eq!(metrics.reserve_balance.value(), dec!(999));
    assert!(metrics.collateral_ratio_bps.is_none());

    let status = engine.price_status();
    assert!(!status.is_valid);
    assert_eq!(status.value, Some(dec!(1.08)));

    assert!(engine.position_info(opened.position_id).is_some());
    assert_eq!(engine.fill_metrics().total_requested.value(), dec!(500));
}

#[test]
fn circuit_breaker_halts_and_resets() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let emergency = engine.create_account();
    engine.grant_role(admin, emergency, Role::Emergency).unwrap();

    let alice = funded_account(&mut engine, dec!(5000));

    // only the emergency capability can trip it
    let denied = engine.trigger_circuit_breaker(alice);
    assert!(matches!(denied, Err(EngineError::Unauthorized { .. })));

    engine.trigger_circuit_breaker(emergency).unwrap();

    let halted = engine
        .mint(alice, ReserveAmount::new(dec!(100)), SyntheticAmount::zero())
        .unwrap_err();
    assert!(matches!(
        halted,
        EngineError::Oracle(OracleError::CircuitBreakerActive)
    ));

    // reset is an admin action, not an emergency one
    let denied = engine.reset_circuit_breaker(emergency);
    assert!(matches!(denied, Err(EngineError::Unauthorized { .. })));

    engine.reset_circuit_breaker(admin).unwrap();
    engine
        .mint(alice, ReserveAmount::new(dec!(100)), SyntheticAmount::zero())
        .unwrap();
}

#[test]
fn price_bounds_administration() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let outsider = engine.create_account();

    let denied = engine.update_price_bounds(outsider, dec!(0.9), dec!(1.5));
    assert!(matches!(denied, Err(EngineError::Unauthorized { .. })));

    let inverted = engine.update_price_bounds(admin, dec!(1.5), dec!(0.9));
    assert!(matches!(inverted, Err(EngineError::InvalidParameter(_))));

    // tighten bounds so the current 1.08 falls outside
    engine.update_price_bounds(admin, dec!(1.10), dec!(1.50)).unwrap();

    let alice = funded_account(&mut engine, dec!(1000));
    let err = engine
        .mint(alice, ReserveAmount::new(dec!(100)), SyntheticAmount::zero())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Oracle(OracleError::InvalidPrice { .. })
    ));

    // the bound change was evented for auditors
    assert!(engine.events().iter().any(|e| matches!(
        e.payload,
        EventPayload::PriceBoundsUpdated(_)
    )));
}

#[test]
fn fee_collection_is_yield_manager_only() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let alice = funded_account(&mut engine, dec!(10_000));
    engine
        .mint(alice, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let treasurer = engine.create_account();

    let denied = engine.collect_fees(treasurer);
    assert!(matches!(denied, Err(EngineError::Unauthorized { .. })));

    engine
        .grant_role(admin, treasurer, Role::YieldManager)
        .unwrap();
    let drawn = engine.collect_fees(treasurer).unwrap();
    assert_eq!(drawn.value(), dec!(1));

    assert_eq!(
        engine.get_account(treasurer).unwrap().reserve_balance.value(),
        dec!(1)
    );
    assert!(engine.vault_metrics().accrued_fees.is_zero());

    // drawer is empty now
    let again = engine.collect_fees(treasurer).unwrap();
    assert!(again.is_zero());
}

#[test]
fn reads_are_idempotent() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let alice = funded_account(&mut engine, dec!(10_000));
    engine
        .mint(alice, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    assert_eq!(engine.vault_metrics(), engine.vault_metrics());
    assert_eq!(engine.fill_metrics(), engine.fill_metrics());
    assert_eq!(engine.active_position_ids(), engine.active_position_ids());
}

#[test]
fn fill_capacity_shrinks_on_redeem() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(10_000));
    let hedger = funded_account(&mut engine, dec!(2000));

    engine
        .open_position(hedger, ReserveAmount::new(dec!(300)), 2, Side::Long)
        .unwrap();
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    // 600 requested, fully backed by 999 of reserves
    let metrics = engine.fill_metrics();
    assert_eq!(metrics.total_filled.value(), dec!(600));

    engine
        .redeem(minter, SyntheticAmount::new(dec!(600)), ReserveAmount::zero())
        .unwrap();

    // capacity dropped below the request; the fill shrank with it
    let metrics = engine.fill_metrics();
    assert!(metrics.total_filled < metrics.total_requested);
    assert!(
        metrics.total_filled <= engine.vault_metrics().reserve_balance,
        "fills must stay inside backing capacity"
    );

    // the shrink was evented with a before/after pair
    let adjusted = engine.events().iter().rev().find_map(|e| match &e.payload {
        EventPayload::FillAdjusted(a) => Some(*a),
        _ => None,
    });
    let adjusted = adjusted.unwrap();
    assert!(adjusted.filled_after < adjusted.filled_before);
}

#[test]
fn snapshot_restore_preserves_metrics() {
    let (mut engine, admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(10_000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let hedger = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(hedger, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    let snapshot = engine.snapshot();

    // survives serialization, as an upgrade handoff would
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: EngineSnapshot = serde_json::from_str(&json).unwrap();

    let source = MockPriceSource::new("test-feed", dec!(1.08), engine.time());
    let restored = Engine::restore(
        EngineConfig::default(),
        EngineParams::default(),
        Box::new(source),
        parsed,
    )
    .unwrap();

    assert_eq!(restored.vault_metrics(), engine.vault_metrics());
    assert_eq!(restored.fill_metrics(), engine.fill_metrics());
    assert_eq!(
        restored.position_info(opened.position_id).unwrap().filled,
        engine.position_info(opened.position_id).unwrap().filled
    );
    assert!(restored.has_role(admin, Role::Admin));
}

#[test]
fn v1_snapshot_migrates_on_restore() {
    let (mut engine, _admin) = build_engine(dec!(1.08));
    let minter = funded_account(&mut engine, dec!(10_000));
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();
    let hedger = funded_account(&mut engine, dec!(1000));
    let opened = engine
        .open_position(hedger, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    // fabricate the pre-fill-tracker layout
    let mut snapshot = engine.snapshot();
    snapshot.version = 1;
    snapshot.fills.clear();

    let source = MockPriceSource::new("test-feed", dec!(1.08), engine.time());
    let restored = Engine::restore(
        EngineConfig::default(),
        EngineParams::default(),
        Box::new(source),
        snapshot,
    )
    .unwrap();

    // migration synthesized a zero-filled record for the active position
    let info = restored.position_info(opened.position_id).unwrap();
    assert!(info.filled.is_zero());
    assert_eq!(
        restored.fill_metrics().total_requested.value(),
        dec!(500)
    );
}
