//! Bot decision policy.
//!
//! `decide` turns one bot's account and a market snapshot into at most one
//! order. It is stateless across calls; whatever a bot "remembers" lives in
//! its account and the price history.

use super::personality::Personality;
use super::random::RandomSource;
use super::universe::CrewDirectory;
use crate::account::Account;
use crate::market::MarketState;
use crate::order::Order;
use crate::types::{Cash, Price, Ticker, Timestamp};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_LOOKBACK_MINUTES: i64 = 60;
const SWING_LOOKBACK_MINUTES: i64 = 240;
const FOLLOWER_SHORT_BOOSTED_MINUTES: i64 = 360;
const FOLLOWER_SHORT_MINUTES: i64 = 720;
const FOLLOWER_LONG_MINUTES: i64 = 1440;
const TOP_N: usize = 10;

#[derive(Debug, Clone)]
struct Candidate {
    ticker: Ticker,
    price: Price,
    /// percent change over the personality's lookback
    trend: Decimal,
    held: u64,
}

struct Context<'a> {
    account: &'a Account,
    market: &'a MarketState,
    universe: Vec<Ticker>,
    now: Timestamp,
    boosted: bool,
}

impl Context<'_> {
    fn candidates(&self, lookback_minutes: i64) -> Vec<Candidate> {
        self.universe
            .iter()
            .filter_map(|ticker| {
                let price = self.market.price(ticker)?;
                Some(Candidate {
                    ticker: ticker.clone(),
                    price,
                    trend: self.market.trend_percent(ticker, self.now, lookback_minutes),
                    held: self.account.shares(ticker),
                })
            })
            .collect()
    }

    fn cash(&self) -> Cash {
        self.account.cash
    }

    fn buy(&self, candidate: &Candidate, fraction: f64, cap: u64) -> Order {
        match buy_size(self.cash(), candidate.price, fraction, cap) {
            Some(shares) => Order::buy(candidate.ticker.clone(), shares),
            None => Order::Hold,
        }
    }
}

fn sell(candidate: &Candidate, fraction: f64) -> Order {
    Order::sell(candidate.ticker.clone(), sell_size(candidate.held, fraction))
}

fn held(candidates: &[Candidate]) -> Vec<Candidate> {
    candidates.iter().filter(|c| c.held > 0).cloned().collect()
}

// strongest risers above `threshold`, best first
fn top_risers(candidates: &[Candidate], threshold: Decimal) -> Vec<Candidate> {
    let mut risers: Vec<Candidate> = candidates.iter().filter(|c| c.trend > threshold).cloned().collect();
    risers.sort_by(|a, b| b.trend.cmp(&a.trend));
    risers.truncate(TOP_N);
    risers
}

// steepest decliners below `threshold`, worst first
fn top_decliners(candidates: &[Candidate], threshold: Decimal) -> Vec<Candidate> {
    let mut decliners: Vec<Candidate> = candidates.iter().filter(|c| c.trend < threshold).cloned().collect();
    decliners.sort_by(|a, b| a.trend.cmp(&b.trend));
    decliners.truncate(TOP_N);
    decliners
}

fn movers(candidates: &[Candidate], min_abs: Decimal) -> Vec<Candidate> {
    candidates.iter().filter(|c| c.trend.abs() >= min_abs).cloned().collect()
}

fn pick<'c>(pool: &'c [Candidate], rng: &mut impl RandomSource) -> Option<&'c Candidate> {
    if pool.is_empty() {
        None
    } else {
        pool.get(rng.below(pool.len()))
    }
}

// random draws carry float noise; six places is plenty for a share count
fn draw_fraction(fraction: f64, fallback: Decimal) -> Decimal {
    Decimal::from_f64(fraction.clamp(0.0, 1.0))
        .map(|d| d.round_dp(6))
        .unwrap_or(fallback)
}

/// Shares to buy: `floor(cash * fraction / price)`, at least 1 when one share
/// is affordable, at most `cap`. `None` when not even one share is affordable.
pub(crate) fn buy_size(cash: Cash, price: Price, fraction: f64, cap: u64) -> Option<u64> {
    if cash < price.times(1) || cap == 0 {
        return None;
    }
    let fraction = draw_fraction(fraction, Decimal::ZERO);
    let max_shares = (cash.value() * fraction / price.value())
        .floor()
        .to_u64()
        .unwrap_or(0)
        .max(1);
    Some(max_shares.min(cap))
}

/// Shares to sell: `ceil(held * fraction)`, kept within `1..=held`.
pub(crate) fn sell_size(held: u64, fraction: f64) -> u64 {
    let fraction = draw_fraction(fraction, Decimal::ONE);
    (Decimal::from(held) * fraction)
        .ceil()
        .to_u64()
        .unwrap_or(held)
        .max(1)
        .min(held)
}

/// Decide what one bot does this round.
pub fn decide(
    account: &Account,
    market: &MarketState,
    crews: &CrewDirectory,
    boosted: bool,
    now: Timestamp,
    rng: &mut impl RandomSource,
) -> Order {
    let universe = crews.tradable(account, market);
    if universe.is_empty() {
        return Order::Hold;
    }

    let ctx = Context {
        account,
        market,
        universe,
        now,
        boosted,
    };

    match account.bot_personality.unwrap_or(Personality::Balanced) {
        Personality::MarketFollower => market_follower(&ctx, rng),
        Personality::Momentum => momentum(&ctx, rng),
        Personality::Contrarian => contrarian(&ctx, rng),
        Personality::Hodler => hodler(&ctx, rng),
        Personality::Daytrader => daytrader(&ctx, rng),
        Personality::Random => random(&ctx, rng),
        Personality::Panic => panic(&ctx, rng),
        Personality::Swing => balanced(&ctx, rng, SWING_LOOKBACK_MINUTES),
        Personality::Balanced => balanced(&ctx, rng, DEFAULT_LOOKBACK_MINUTES),
    }
}

fn market_follower(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let short_minutes = if ctx.boosted {
        FOLLOWER_SHORT_BOOSTED_MINUTES
    } else {
        FOLLOWER_SHORT_MINUTES
    };
    let long = ctx.candidates(FOLLOWER_LONG_MINUTES);
    // blend the two timescales, short one dominant
    let candidates: Vec<Candidate> = ctx
        .candidates(short_minutes)
        .into_iter()
        .zip(long)
        .map(|(mut short, long)| {
            short.trend = short.trend * dec!(0.7) + long.trend * dec!(0.3);
            short
        })
        .collect();

    let falling = top_decliners(&held(&candidates), dec!(-1));
    let sell_chance = if ctx.boosted { 0.65 } else { 0.5 };
    if let Some(worst) = falling.first() {
        if rng.chance(sell_chance) {
            let fraction = if ctx.boosted {
                rng.between(0.5, 1.0)
            } else {
                rng.between(0.25, 0.75)
            };
            return sell(worst, fraction);
        }
    }

    let roll = rng.next_f64();
    let mut pool = if roll < 0.4 {
        top_risers(&candidates, Decimal::ZERO)
    } else if roll < 0.7 {
        movers(&candidates, dec!(0.5))
    } else {
        candidates.clone()
    };
    if pool.is_empty() {
        pool = candidates;
    }

    let Some(target) = pick(&pool, rng) else {
        return Order::Hold;
    };
    let mut fraction = rng.between(0.05, 0.20);
    if ctx.boosted {
        fraction *= 1.5;
    }
    ctx.buy(target, fraction, 15)
}

fn momentum(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);

    let falling = top_decliners(&held(&candidates), dec!(-1));
    if let Some(worst) = falling.first() {
        if rng.chance(0.7) {
            return sell(worst, rng.between(0.5, 1.0));
        }
    }

    let risers = top_risers(&candidates, dec!(1));
    if !risers.is_empty() && rng.chance(0.6) {
        if let Some(target) = pick(&risers, rng) {
            return ctx.buy(target, rng.between(0.1, 0.3), 10);
        }
    }

    Order::Hold
}

fn contrarian(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);

    // take profit on whatever ran up
    let rallied = top_risers(&held(&candidates), dec!(1.5));
    if let Some(best) = rallied.first() {
        if rng.chance(0.6) {
            return sell(best, rng.between(0.3, 0.7));
        }
    }

    let decliners = top_decliners(&candidates, dec!(-1.5));
    if !decliners.is_empty() && rng.chance(0.6) {
        if let Some(target) = pick(&decliners, rng) {
            return ctx.buy(target, rng.between(0.1, 0.25), 15);
        }
    }

    Order::Hold
}

fn hodler(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    if rng.chance(0.9) {
        return Order::Hold;
    }

    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);
    if rng.chance(0.1) {
        let large: Vec<Candidate> = candidates.iter().filter(|c| c.held > 10).cloned().collect();
        if let Some(position) = pick(&large, rng) {
            return sell(position, 0.2);
        }
    }

    if ctx.cash().value() <= dec!(100) {
        return Order::Hold;
    }
    match pick(&candidates, rng) {
        Some(target) => ctx.buy(target, rng.between(0.05, 0.10), 8),
        None => Order::Hold,
    }
}

fn daytrader(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);

    let positions = held(&candidates);
    if !positions.is_empty() && rng.chance(0.5) {
        if let Some(position) = pick(&positions, rng) {
            return sell(position, rng.between(0.5, 1.0));
        }
    }

    if ctx.cash().value() <= dec!(20) {
        return Order::Hold;
    }
    let mut pool = if rng.chance(0.5) {
        movers(&candidates, dec!(0.5))
    } else {
        candidates.clone()
    };
    if pool.is_empty() {
        pool = candidates;
    }
    match pick(&pool, rng) {
        Some(target) => ctx.buy(target, rng.between(0.05, 0.15), 5),
        None => Order::Hold,
    }
}

fn random(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);

    if rng.chance(0.5) {
        return match pick(&candidates, rng) {
            Some(target) => ctx.buy(target, rng.next_f64(), 20),
            None => Order::Hold,
        };
    }

    let positions = held(&candidates);
    match pick(&positions, rng) {
        Some(position) => sell(position, rng.next_f64()),
        None => Order::Hold,
    }
}

fn panic(ctx: &Context<'_>, rng: &mut impl RandomSource) -> Order {
    let candidates = ctx.candidates(DEFAULT_LOOKBACK_MINUTES);

    // no gate: anything falling gets dumped in full
    if let Some(worst) = top_decliners(&held(&candidates), dec!(-1)).first() {
        return sell(worst, 1.0);
    }

    if rng.chance(0.3) {
        let risers = top_risers(&candidates, dec!(0.5));
        if let Some(target) = pick(&risers, rng) {
            return ctx.buy(target, rng.between(0.05, 0.15), 10);
        }
    }

    Order::Hold
}

fn balanced(ctx: &Context<'_>, rng: &mut impl RandomSource, lookback_minutes: i64) -> Order {
    let candidates = ctx.candidates(lookback_minutes);
    let roll = rng.next_f64();

    if roll < 0.3 {
        let positions = held(&candidates);
        let mut swinging = movers(&positions, dec!(2));
        swinging.sort_by(|a, b| b.trend.abs().cmp(&a.trend.abs()));
        let target = match swinging.first() {
            Some(c) => Some(c),
            None => pick(&positions, rng),
        };
        return match target {
            Some(position) => sell(position, rng.between(0.2, 0.5)),
            None => Order::Hold,
        };
    }

    if roll < 0.7 {
        let mut pool = if rng.chance(0.5) {
            top_risers(&candidates, Decimal::ZERO)
        } else {
            candidates.clone()
        };
        if pool.is_empty() {
            pool = candidates;
        }
        return match pick(&pool, rng) {
            Some(target) => ctx.buy(target, rng.between(0.05, 0.20), 12),
            None => Order::Hold,
        };
    }

    Order::Hold
}
