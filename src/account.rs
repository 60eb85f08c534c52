//! Account ledger.
//!
//! One record per trader, human or bot. Cash and holdings can never go
//! negative; the trade log keeps the most recent entries only.

use crate::bot::Personality;
use crate::config::TRANSACTION_LOG_LIMIT;
use crate::market::MarketState;
use crate::types::{AccountId, Cash, Price, Side, Ticker, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One settled trade as it appears in the account's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub ticker: Ticker,
    pub shares: u64,
    pub price_per_share: Price,
    /// Cost for a buy, revenue for a sell.
    pub total: Cash,
    pub cash_before: Cash,
    pub cash_after: Cash,
    pub portfolio_after: Cash,
    /// Market price after this trade's impact.
    pub price_after: Price,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub cash: Cash,
    pub holdings: BTreeMap<Ticker, u64>,
    pub cost_basis: BTreeMap<Ticker, Cash>,
    pub transaction_log: VecDeque<TradeRecord>,
    pub total_trades: u64,
    pub portfolio_value: Cash,
    pub bot_personality: Option<Personality>,
    pub bot_crew: Option<String>,
}

impl Account {
    pub fn new(id: AccountId, cash: Cash) -> Self {
        Self {
            id,
            cash,
            holdings: BTreeMap::new(),
            cost_basis: BTreeMap::new(),
            transaction_log: VecDeque::new(),
            total_trades: 0,
            portfolio_value: cash,
            bot_personality: None,
            bot_crew: None,
        }
    }

    pub fn new_bot(id: AccountId, cash: Cash, personality: Personality) -> Self {
        let mut account = Self::new(id, cash);
        account.bot_personality = Some(personality);
        account
    }

    pub fn with_crew(mut self, crew: impl Into<String>) -> Self {
        self.bot_crew = Some(crew.into());
        self
    }

    pub fn is_bot(&self) -> bool {
        self.bot_personality.is_some()
    }

    pub fn shares(&self, ticker: &Ticker) -> u64 {
        self.holdings.get(ticker).copied().unwrap_or(0)
    }

    /// Tickers with a non-zero position, in ticker order.
    pub fn held_tickers(&self) -> impl Iterator<Item = (&Ticker, u64)> {
        self.holdings
            .iter()
            .filter(|(_, shares)| **shares > 0)
            .map(|(ticker, shares)| (ticker, *shares))
    }

    pub fn debit(&mut self, amount: Cash) -> Result<(), AccountError> {
        if amount > self.cash {
            return Err(AccountError::InsufficientFunds {
                requested: amount,
                available: self.cash,
            });
        }
        self.cash = self.cash - amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Cash) {
        self.cash = self.cash + amount;
    }

    /// Add bought shares and their cost.
    pub fn add_shares(&mut self, ticker: &Ticker, shares: u64, cost: Cash) {
        *self.holdings.entry(ticker.clone()).or_insert(0) += shares;
        let basis = self.cost_basis.entry(ticker.clone()).or_insert_with(Cash::zero);
        *basis = *basis + cost;
    }

    /// Remove sold shares. Cost basis shrinks in proportion to the shares
    /// removed and is dropped together with an emptied position.
    pub fn remove_shares(&mut self, ticker: &Ticker, shares: u64) -> Result<(), AccountError> {
        let held = self.shares(ticker);
        if shares > held {
            return Err(AccountError::InsufficientShares {
                ticker: ticker.clone(),
                requested: shares,
                held,
            });
        }

        let remaining = held - shares;
        if remaining == 0 {
            self.holdings.remove(ticker);
            self.cost_basis.remove(ticker);
            return Ok(());
        }

        self.holdings.insert(ticker.clone(), remaining);
        if let Some(basis) = self.cost_basis.get_mut(ticker) {
            let kept = Decimal::from(remaining) / Decimal::from(held);
            *basis = (*basis * kept).round_dp(2);
        }
        Ok(())
    }

    /// Recompute and store cash plus marked holdings.
    pub fn revalue(&mut self, market: &MarketState) -> Cash {
        self.portfolio_value = self.cash + market.holdings_value(&self.holdings);
        self.portfolio_value
    }

    /// Append to the log, evicting the oldest entries past the limit.
    pub fn record_trade(&mut self, record: TradeRecord) {
        self.transaction_log.push_back(record);
        while self.transaction_log.len() > TRANSACTION_LOG_LIMIT {
            self.transaction_log.pop_front();
        }
        self.total_trades += 1;
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Cash, available: Cash },

    #[error("Insufficient shares of {ticker}: requested {requested}, held {held}")]
    InsufficientShares { ticker: Ticker, requested: u64, held: u64 },
}
