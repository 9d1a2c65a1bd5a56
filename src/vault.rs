// 3.0 vault.rs: the collateral ledger. converts reserve deposits into synthetic
// issuance and back, tracks aggregate reserves/supply/fees, and derives the
// collateralization ratio. quote_* functions are pure; VaultState holds the
// singleton balances and is only mutated inside engine mint/redeem.

use crate::types::{Bps, Price, ReserveAmount, SyntheticAmount, Timestamp};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultParams {
    pub min_mint: ReserveAmount,
    pub max_mint: ReserveAmount,
    pub min_redeem: SyntheticAmount,
    pub max_redeem: SyntheticAmount,
    /// Fee charged on mint and redeem, in basis points of the gross amount.
    pub fee_bps: Bps,
    /// Minimum collateralization ratio the ledger must keep after a redeem.
    pub min_collateral_ratio_bps: Bps,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            min_mint: ReserveAmount::new(dec!(10)),
            max_mint: ReserveAmount::new(dec!(10_000_000)),
            min_redeem: SyntheticAmount::new(dec!(10)),
            max_redeem: SyntheticAmount::new(dec!(10_000_000)),
            fee_bps: Bps::new(10),
            min_collateral_ratio_bps: Bps::new(11_000),
        }
    }
}

/// Singleton vault balances. `reserve_balance` holds issuance deposits net of
/// fees; `accrued_fees` is the drawer the yield manager empties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    pub reserve_balance: ReserveAmount,
    pub synthetic_supply: SyntheticAmount,
    pub accrued_fees: ReserveAmount,
    pub last_update: Timestamp,
}

impl VaultState {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            reserve_balance: ReserveAmount::zero(),
            synthetic_supply: SyntheticAmount::zero(),
            accrued_fees: ReserveAmount::zero(),
            last_update: timestamp,
        }
    }

    pub fn apply_mint(&mut self, quote: &MintQuote, reserve_in: ReserveAmount, now: Timestamp) {
        self.reserve_balance = self.reserve_balance.add(reserve_in.sub(quote.fee));
        self.synthetic_supply = self.synthetic_supply.add(quote.synthetic_out);
        self.accrued_fees = self.accrued_fees.add(quote.fee);
        self.last_update = now;
    }

    pub fn apply_redeem(
        &mut self,
        quote: &RedeemQuote,
        synthetic_in: SyntheticAmount,
        now: Timestamp,
    ) {
        self.reserve_balance = self.reserve_balance.sub(quote.reserve_out.add(quote.fee));
        self.synthetic_supply = self.synthetic_supply.sub(synthetic_in);
        self.accrued_fees = self.accrued_fees.add(quote.fee);
        self.last_update = now;
    }

    /// Empty the fee drawer. Returns what was drawn.
    pub fn draw_fees(&mut self, now: Timestamp) -> ReserveAmount {
        let drawn = self.accrued_fees;
        self.accrued_fees = ReserveAmount::zero();
        self.last_update = now;
        drawn
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MintQuote {
    pub synthetic_out: SyntheticAmount,
    pub fee: ReserveAmount,
}

#[derive(Debug, Clone, Copy)]
pub struct RedeemQuote {
    pub reserve_out: ReserveAmount,
    pub fee: ReserveAmount,
}

/// synthetic_out = (reserve_in - fee) * price, truncated to 18dp.
pub fn quote_mint(reserve_in: ReserveAmount, price: Price, fee_bps: Bps) -> MintQuote {
    let fee = reserve_in.mul(fee_bps.as_fraction());
    let net = reserve_in.sub(fee);
    let synthetic_out = SyntheticAmount::new(net.value() * price.value());
    MintQuote { synthetic_out, fee }
}

/// reserve_out = synthetic_in / price - fee, truncated to 6dp. Algebraic
/// inverse of quote_mint with its own fee leg.
pub fn quote_redeem(synthetic_in: SyntheticAmount, price: Price, fee_bps: Bps) -> RedeemQuote {
    let gross = ReserveAmount::new(synthetic_in.value() / price.value());
    let fee = gross.mul(fee_bps.as_fraction());
    let reserve_out = gross.sub(fee);
    RedeemQuote { reserve_out, fee }
}

/// Collateralization ratio in bps: backing value (reserve units, priced into
/// synthetic terms) over outstanding supply. None when no supply is out.
/// `backing` is everything held against issuance, not just the mint deposits;
/// the engine passes reserves plus aggregate hedge margin.
pub fn collateral_ratio_bps(
    backing: ReserveAmount,
    supply: SyntheticAmount,
    price: Price,
) -> Option<Bps> {
    if supply.is_zero() {
        return None;
    }
    Bps::from_ratio(backing.value() * price.value(), supply.value())
}

/// Supply value over backing, the inverse view of the collateral ratio.
pub fn utilization_bps(
    backing: ReserveAmount,
    supply: SyntheticAmount,
    price: Price,
) -> Option<Bps> {
    if !backing.is_positive() {
        return None;
    }
    Bps::from_ratio(supply.value(), backing.value() * price.value())
}

/// Pure read returned by the engine's metrics surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetrics {
    pub reserve_balance: ReserveAmount,
    pub synthetic_supply: SyntheticAmount,
    pub accrued_fees: ReserveAmount,
    /// None while no usable price exists or no supply is outstanding.
    pub collateral_ratio_bps: Option<Bps>,
    pub utilization_bps: Option<Bps>,
}
