//! Market ledger.
//!
//! One shared record holding the quoted price of every ticker, its price
//! history and the global halt flag. Every trade reads and writes it.

use crate::types::{Cash, Price, Ticker, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: Price,
}

/// Shared market state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub prices: BTreeMap<Ticker, Price>,
    /// Append only, oldest first.
    pub price_history: BTreeMap<Ticker, Vec<PricePoint>>,
    /// When set no trade may execute.
    pub market_halted: bool,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ticker at an opening price with a one point history.
    pub fn seed_ticker(&mut self, ticker: Ticker, price: Price, timestamp: Timestamp) {
        self.price_history
            .entry(ticker.clone())
            .or_default()
            .push(PricePoint { timestamp, price });
        self.prices.insert(ticker, price);
    }

    pub fn price(&self, ticker: &Ticker) -> Option<Price> {
        self.prices.get(ticker).copied()
    }

    pub fn history(&self, ticker: &Ticker) -> &[PricePoint] {
        self.price_history
            .get(ticker)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.prices.keys()
    }

    pub fn is_halted(&self) -> bool {
        self.market_halted
    }

    /// Set the quoted price and append it to the history.
    pub fn apply_price(&mut self, ticker: &Ticker, price: Price, timestamp: Timestamp) {
        self.prices.insert(ticker.clone(), price);
        self.price_history
            .entry(ticker.clone())
            .or_default()
            .push(PricePoint { timestamp, price });
    }

    /// Append the current price of every ticker to its history.
    /// Returns the number of points written.
    pub fn record_history(&mut self, timestamp: Timestamp) -> usize {
        let mut written = 0;
        for (ticker, price) in &self.prices {
            self.price_history
                .entry(ticker.clone())
                .or_default()
                .push(PricePoint {
                    timestamp,
                    price: *price,
                });
            written += 1;
        }
        written
    }

    /// Mark to market a set of holdings. Tickers without a price count as zero.
    pub fn holdings_value<'a>(&self, holdings: impl IntoIterator<Item = (&'a Ticker, &'a u64)>) -> Cash {
        holdings
            .into_iter()
            .filter_map(|(ticker, shares)| self.price(ticker).map(|p| p.times(*shares)))
            .sum()
    }

    /// Percent change of `ticker` over the last `lookback_minutes`.
    ///
    /// The reference price is the newest history point at or before
    /// `now - lookback`, or the oldest point when history doesn't reach back
    /// that far. Fewer than two points means no trend.
    pub fn trend_percent(&self, ticker: &Ticker, now: Timestamp, lookback_minutes: i64) -> Decimal {
        let history = self.history(ticker);
        if history.len() < 2 {
            return Decimal::ZERO;
        }

        let current = match self.price(ticker) {
            Some(p) => p,
            None => history[history.len() - 1].price,
        };

        let cutoff = now.minus_minutes(lookback_minutes);
        let reference = history
            .iter()
            .rev()
            .find(|point| point.timestamp <= cutoff)
            .unwrap_or(&history[0])
            .price;

        (current.value() - reference.value()) / reference.value() * dec!(100)
    }
}
