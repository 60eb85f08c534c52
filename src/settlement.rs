// 9.0 settlement.rs: applies one decided order to an account and the market, atomically.
// preconditions are checked against the fresh records inside the transaction, never the
// caller's snapshot. a failed precondition rolls back and reports a SkipReason.
//
// buys execute at the pre-impact price, sells at the post-impact price.

use crate::account::{Account, TradeRecord};
use crate::config::ImpactParams;
use crate::market::MarketState;
use crate::order::TradeOrder;
use crate::pricing::price_after_trade;
use crate::store::{MarketStore, StoreError, TxOutcome};
use crate::types::{AccountId, Side, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Why an order was not applied. These are normal outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MarketHalted,
    UnknownTicker,
    ZeroShares,
    InsufficientFunds,
    InsufficientShares,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Applied(TradeRecord),
    Skipped(SkipReason),
}

impl Settlement {
    pub fn is_applied(&self) -> bool {
        matches!(self, Settlement::Applied(_))
    }

    pub fn record(&self) -> Option<&TradeRecord> {
        match self {
            Settlement::Applied(record) => Some(record),
            Settlement::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => SettlementError::AccountNotFound(id),
            other => SettlementError::Store(other),
        }
    }
}

/// Settle `order` for `account_id` in one store transaction.
pub fn settle<S: MarketStore>(
    store: &S,
    account_id: &AccountId,
    order: &TradeOrder,
    now: Timestamp,
    params: &ImpactParams,
) -> Result<Settlement, SettlementError> {
    let outcome = store.transact(account_id, |account, market| {
        match apply_trade(account, market, order, now, params) {
            Ok(record) => TxOutcome::Commit(Settlement::Applied(record)),
            Err(reason) => TxOutcome::Rollback(Settlement::Skipped(reason)),
        }
    })?;

    match &outcome {
        Settlement::Applied(record) => debug!(
            account = %account_id,
            order = %order,
            price = %record.price_per_share,
            price_after = %record.price_after,
            "trade settled"
        ),
        Settlement::Skipped(SkipReason::UnknownTicker) => {
            warn!(account = %account_id, ticker = %order.ticker, "no price for ticker, order skipped")
        }
        Settlement::Skipped(reason) => {
            debug!(account = %account_id, order = %order, ?reason, "order skipped")
        }
    }

    Ok(outcome)
}

/// Validate and apply one trade to in-memory copies of the two records.
/// On `Err` the copies may be partially written and must be discarded.
pub fn apply_trade(
    account: &mut Account,
    market: &mut MarketState,
    order: &TradeOrder,
    now: Timestamp,
    params: &ImpactParams,
) -> Result<TradeRecord, SkipReason> {
    if market.is_halted() {
        return Err(SkipReason::MarketHalted);
    }
    let Some(current_price) = market.price(&order.ticker) else {
        return Err(SkipReason::UnknownTicker);
    };
    if order.shares == 0 {
        return Err(SkipReason::ZeroShares);
    }

    let cash_before = account.cash;
    let new_price = price_after_trade(current_price, order.side, order.shares, params);

    let (price_per_share, total) = match order.side {
        Side::Buy => {
            let total_cost = current_price.times(order.shares);
            account
                .debit(total_cost)
                .map_err(|_| SkipReason::InsufficientFunds)?;
            account.add_shares(&order.ticker, order.shares, total_cost);
            (current_price, total_cost)
        }
        Side::Sell => {
            account
                .remove_shares(&order.ticker, order.shares)
                .map_err(|_| SkipReason::InsufficientShares)?;
            let total_revenue = new_price.times(order.shares);
            account.credit(total_revenue);
            (new_price, total_revenue)
        }
    };

    // valued against the pre-trade price map
    let portfolio_after = account.revalue(market);

    let record = TradeRecord {
        side: order.side,
        ticker: order.ticker.clone(),
        shares: order.shares,
        price_per_share,
        total,
        cash_before,
        cash_after: account.cash,
        portfolio_after,
        price_after: new_price,
        timestamp: now,
    };
    account.record_trade(record.clone());
    market.apply_price(&order.ticker, new_price, now);

    Ok(record)
}
