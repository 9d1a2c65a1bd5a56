//! Synthetic Currency Engine Simulation.
//!
//! Demonstrates the full engine lifecycle: issuance against reserves, hedge
//! position tracking with fill apportionment, price moves and PnL, and a
//! liquidation under a usable oracle price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_core::*;

fn main() {
    println!("Synthetic Currency Core Engine Simulation");
    println!("Single Vault, Price-Gated Operations, Full Lifecycle\n");

    scenario_1_issuance();
    scenario_2_hedge_and_pnl();
    scenario_3_liquidation();
    scenario_4_oracle_failures();

    println!("\nAll simulations completed successfully.");
}

fn build_engine(price: Decimal) -> (Engine, AccountId) {
    // logical clock seeded from wall time so event timestamps read naturally
    let now = Timestamp::now();
    let source = MockPriceSource::new("sim-feed", price, now);
    let mut engine = Engine::new(
        EngineConfig::default(),
        EngineParams::default(),
        Box::new(source),
    );
    engine.set_time(now);
    let admin = engine.create_account();
    engine.bootstrap_admin(admin).unwrap();
    (engine, admin)
}

fn set_price(engine: &mut Engine, admin: AccountId, value: Decimal) {
    let source = MockPriceSource::new("sim-feed", value, engine.time());
    engine.update_feed_reference(admin, Box::new(source)).unwrap();
}

/// Mint synthetic against reserve deposits, then redeem back.
fn scenario_1_issuance() {
    println!("Scenario 1: Issuance and Redemption\n");

    let (mut engine, _admin) = build_engine(dec!(1.08));

    let alice = engine.create_account();
    engine
        .deposit_reserve(alice, ReserveAmount::new(dec!(10_000)))
        .unwrap();

    // hedge margin keeps the ledger above the redemption floor
    let hedger = engine.create_account();
    engine
        .deposit_reserve(hedger, ReserveAmount::new(dec!(500)))
        .unwrap();
    engine
        .open_position(hedger, ReserveAmount::new(dec!(200)), 1, Side::Long)
        .unwrap();

    println!("  Alice deposits 10,000 reserve, oracle at 1.08");

    let minted = engine
        .mint(alice, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();
    println!(
        "  Mint 1,000 reserve -> {} synthetic (fee {})",
        minted.synthetic_out, minted.fee
    );

    let metrics = engine.vault_metrics();
    println!(
        "  Vault: reserves {}, supply {}, CR {:?}",
        metrics.reserve_balance, metrics.synthetic_supply, metrics.collateral_ratio_bps
    );

    let redeemed = engine
        .redeem(alice, minted.synthetic_out, ReserveAmount::zero())
        .unwrap();
    println!(
        "  Redeem all synthetic -> {} reserve (fee {})\n",
        redeemed.reserve_out, redeemed.fee
    );
}

/// Open a leveraged hedge, watch fills and PnL move with price.
fn scenario_2_hedge_and_pnl() {
    println!("Scenario 2: Hedge Position and PnL\n");

    let (mut engine, admin) = build_engine(dec!(1.08));

    let minter = engine.create_account();
    engine
        .deposit_reserve(minter, ReserveAmount::new(dec!(5000)))
        .unwrap();
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let bob = engine.create_account();
    engine
        .deposit_reserve(bob, ReserveAmount::new(dec!(1000)))
        .unwrap();

    let opened = engine
        .open_position(bob, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();
    println!(
        "  Bob opens 100 margin at 5x: notional {}, filled {}",
        opened.notional, opened.filled
    );

    set_price(&mut engine, admin, dec!(1.134));
    let info = engine.position_info(opened.position_id).unwrap();
    println!(
        "  Price moves 1.08 -> 1.134 (+5%): unrealized PnL {:?}, margin ratio {:?}",
        info.unrealized_pnl, info.margin_ratio_bps
    );

    let closed = engine.close_position(bob, opened.position_id).unwrap();
    println!(
        "  Close: realized {}, returned {}\n",
        closed.realized_pnl, closed.margin_returned
    );
}

/// Drift a position below the liquidation threshold and seize it.
fn scenario_3_liquidation() {
    println!("Scenario 3: Liquidation\n");

    let (mut engine, admin) = build_engine(dec!(1.08));

    let minter = engine.create_account();
    engine
        .deposit_reserve(minter, ReserveAmount::new(dec!(5000)))
        .unwrap();
    engine
        .mint(minter, ReserveAmount::new(dec!(1000)), SyntheticAmount::zero())
        .unwrap();

    let carol = engine.create_account();
    engine
        .deposit_reserve(carol, ReserveAmount::new(dec!(1000)))
        .unwrap();
    let opened = engine
        .open_position(carol, ReserveAmount::new(dec!(100)), 5, Side::Long)
        .unwrap();

    let keeper = engine.create_account();
    engine.grant_role(admin, keeper, Role::Liquidator).unwrap();

    set_price(&mut engine, admin, dec!(0.918));
    let info = engine.position_info(opened.position_id).unwrap();
    println!(
        "  Price drops to 0.918: margin ratio {:?} (threshold 10500bps)",
        info.margin_ratio_bps
    );

    let result = engine
        .liquidate_position(keeper, opened.position_id)
        .unwrap();
    println!(
        "  Liquidated: seized {}, keeper reward {}, bad debt {}",
        result.seized, result.liquidator_reward, result.bad_debt
    );

    let second = engine.liquidate_position(keeper, opened.position_id);
    println!("  Second attempt: {:?}\n", second.unwrap_err());
}

/// Stale feeds and the circuit breaker block mutations, reads keep working.
fn scenario_4_oracle_failures() {
    println!("Scenario 4: Oracle Failure Modes\n");

    let (mut engine, admin) = build_engine(dec!(1.08));
    let emergency = engine.create_account();
    engine.grant_role(admin, emergency, Role::Emergency).unwrap();

    let dave = engine.create_account();
    engine
        .deposit_reserve(dave, ReserveAmount::new(dec!(1000)))
        .unwrap();

    engine.advance_time(600_000);
    let stale = engine.mint(dave, ReserveAmount::new(dec!(100)), SyntheticAmount::zero());
    println!("  Mint on stale feed: {:?}", stale.unwrap_err());

    set_price(&mut engine, admin, dec!(1.08));
    engine.trigger_circuit_breaker(emergency).unwrap();
    let halted = engine.mint(dave, ReserveAmount::new(dec!(100)), SyntheticAmount::zero());
    println!("  Mint under circuit breaker: {:?}", halted.unwrap_err());

    let status = engine.price_status();
    println!(
        "  Metrics still readable: price {:?}, valid {}",
        status.value, status.is_valid
    );

    engine.reset_circuit_breaker(admin).unwrap();
    engine
        .mint(dave, ReserveAmount::new(dec!(100)), SyntheticAmount::zero())
        .unwrap();
    println!("  After reset, mint succeeds\n");
}
