//! Issuance entry points: mint reserve into synthetic, redeem back out.
//! Both read the price gate fresh, validate fully, then mutate in one pass.

use super::core::Engine;
use super::results::{EngineError, MintResult, RedeemResult};
use crate::events::{EventPayload, MintedEvent, RedeemedEvent};
use crate::types::{AccountId, Bps, ReserveAmount, SyntheticAmount};
use crate::vault::{collateral_ratio_bps, quote_mint, quote_redeem};

impl Engine {
    pub fn mint(
        &mut self,
        caller: AccountId,
        reserve_in: ReserveAmount,
        min_synthetic_out: SyntheticAmount,
    ) -> Result<MintResult, EngineError> {
        if !reserve_in.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: reserve_in.value(),
            });
        }
        if reserve_in < self.params.vault.min_mint {
            return Err(EngineError::BelowMinimum {
                value: reserve_in.value(),
                minimum: self.params.vault.min_mint.value(),
            });
        }
        if reserve_in > self.params.vault.max_mint {
            return Err(EngineError::ExceedsLimit {
                value: reserve_in.value(),
                limit: self.params.vault.max_mint.value(),
            });
        }

        let price = self.usable_price()?;
        let quote = quote_mint(reserve_in, price, self.params.vault.fee_bps);

        if quote.synthetic_out < min_synthetic_out {
            return Err(EngineError::SlippageExceeded {
                actual: quote.synthetic_out.value(),
                minimum: min_synthetic_out.value(),
            });
        }

        let account = self.account_mut(caller)?;
        account.debit_reserve(reserve_in)?;
        account.credit_synthetic(quote.synthetic_out);

        self.vault.apply_mint(&quote, reserve_in, self.current_time);

        self.emit_event(EventPayload::Minted(MintedEvent {
            account_id: caller,
            reserve_in,
            synthetic_out: quote.synthetic_out,
            fee: quote.fee,
            price,
        }));
        self.sync_fills();

        Ok(MintResult {
            synthetic_out: quote.synthetic_out,
            fee: quote.fee,
            price,
        })
    }

    pub fn redeem(
        &mut self,
        caller: AccountId,
        synthetic_in: SyntheticAmount,
        min_reserve_out: ReserveAmount,
    ) -> Result<RedeemResult, EngineError> {
        if !synthetic_in.is_positive() {
            return Err(EngineError::InvalidAmount {
                amount: synthetic_in.value(),
            });
        }
        if synthetic_in < self.params.vault.min_redeem {
            return Err(EngineError::BelowMinimum {
                value: synthetic_in.value(),
                minimum: self.params.vault.min_redeem.value(),
            });
        }
        if synthetic_in > self.params.vault.max_redeem {
            return Err(EngineError::ExceedsLimit {
                value: synthetic_in.value(),
                limit: self.params.vault.max_redeem.value(),
            });
        }

        let price = self.usable_price()?;
        let quote = quote_redeem(synthetic_in, price, self.params.vault.fee_bps);

        if quote.reserve_out < min_reserve_out {
            return Err(EngineError::SlippageExceeded {
                actual: quote.reserve_out.value(),
                minimum: min_reserve_out.value(),
            });
        }

        // the ledger must stay collateralized after paying out; hedge margin
        // counts toward the backing alongside the issuance reserves
        let gross = quote.reserve_out.add(quote.fee);
        let post_reserve = self.vault.reserve_balance.sub(gross);
        let post_supply = self.vault.synthetic_supply.sub(synthetic_in);
        let minimum = self.params.vault.min_collateral_ratio_bps;

        if post_reserve.is_negative() {
            return Err(EngineError::InsufficientCollateralization {
                resulting: Bps::new(0),
                minimum,
            });
        }
        if !post_supply.is_zero() {
            let post_backing = self.collateral_backing().sub(gross);
            let resulting = collateral_ratio_bps(post_backing, post_supply, price)
                .unwrap_or(Bps::new(0));
            if resulting < minimum {
                return Err(EngineError::InsufficientCollateralization { resulting, minimum });
            }
        }

        let account = self.account_mut(caller)?;
        account.debit_synthetic(synthetic_in)?;
        account.credit_reserve(quote.reserve_out);

        self.vault
            .apply_redeem(&quote, synthetic_in, self.current_time);

        self.emit_event(EventPayload::Redeemed(RedeemedEvent {
            account_id: caller,
            synthetic_in,
            reserve_out: quote.reserve_out,
            fee: quote.fee,
            price,
        }));
        self.sync_fills();

        Ok(RedeemResult {
            reserve_out: quote.reserve_out,
            fee: quote.fee,
            price,
        })
    }
}
