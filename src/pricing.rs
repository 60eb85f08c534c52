//! Price impact model.
//!
//! Square root impact: doubling an order does not double its price move.
//! Every trade moves the price by at most `max_change_fraction` and never
//! below `min_price`. Pure functions only, no state and no randomness.

use crate::config::ImpactParams;
use crate::types::{Price, Side};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Absolute price move caused by trading `shares` against `current_price`.
///
/// `delta = price * base_impact * sqrt(shares / liquidity)`, clamped to
/// `price * max_change_fraction`. A non-positive liquidity falls back to the
/// canonical liquidity constant.
pub fn price_impact(current_price: Price, shares: u64, params: &ImpactParams) -> Decimal {
    let liquidity = if params.liquidity > Decimal::ZERO {
        params.liquidity
    } else {
        crate::config::BASE_LIQUIDITY
    };

    let ratio = Decimal::from(shares) / liquidity;
    let root = ratio.sqrt().unwrap_or(Decimal::ZERO);
    let raw = current_price.value() * params.base_impact * root;
    let cap = current_price.value() * params.max_change_fraction;

    raw.min(cap)
}

/// Price after the impact of one trade, rounded to cents and floored at `min_price`.
pub fn price_after_trade(current_price: Price, side: Side, shares: u64, params: &ImpactParams) -> Price {
    let delta = price_impact(current_price, shares, params);
    let moved = (current_price.value() + side.sign() * delta)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Price::new_unchecked(moved.max(params.min_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    #[test]
    fn quarter_liquidity_moves_sixty_cents() {
        let params = ImpactParams::default();
        let delta = price_impact(price(dec!(100.00)), 25, &params);
        assert_eq!(delta.round_dp(8), dec!(0.6));
        assert_eq!(
            price_after_trade(price(dec!(100.00)), Side::Buy, 25, &params).value(),
            dec!(100.60)
        );
    }

    #[test]
    fn large_order_is_clamped() {
        let params = ImpactParams::default();
        // raw impact 10 * 0.012 * sqrt(100) = 1.2, cap is 0.5
        let delta = price_impact(price(dec!(10.00)), 10_000, &params);
        assert_eq!(delta, dec!(0.5));
        assert_eq!(
            price_after_trade(price(dec!(10.00)), Side::Buy, 10_000, &params).value(),
            dec!(10.50)
        );
        assert_eq!(
            price_after_trade(price(dec!(10.00)), Side::Sell, 10_000, &params).value(),
            dec!(9.50)
        );
    }

    #[test]
    fn zero_shares_has_no_impact() {
        let params = ImpactParams::default();
        assert_eq!(price_impact(price(dec!(42)), 0, &params), Decimal::ZERO);
        assert_eq!(
            price_after_trade(price(dec!(42)), Side::Sell, 0, &params).value(),
            dec!(42)
        );
    }

    #[test]
    fn sell_never_drops_below_floor() {
        let params = ImpactParams::default();
        let after = price_after_trade(price(dec!(0.01)), Side::Sell, 1_000_000, &params);
        assert_eq!(after.value(), dec!(0.01));
    }

    #[test]
    fn bad_liquidity_uses_default() {
        let mut params = ImpactParams::default();
        params.liquidity = Decimal::ZERO;
        let delta = price_impact(price(dec!(100)), 25, &params);
        assert_eq!(delta.round_dp(8), dec!(0.6));
    }
}
