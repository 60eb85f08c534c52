// 2.0: orders. produced by the bot policy (or a player), consumed by settlement.
// Hold never reaches settlement: only a TradeOrder can be settled.

use crate::types::{Side, Ticker};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub side: Side,
    pub ticker: Ticker,
    pub shares: u64,
}

impl TradeOrder {
    pub fn buy(ticker: Ticker, shares: u64) -> Self {
        Self {
            side: Side::Buy,
            ticker,
            shares,
        }
    }

    pub fn sell(ticker: Ticker, shares: u64) -> Self {
        Self {
            side: Side::Sell,
            ticker,
            shares,
        }
    }
}

impl fmt::Display for TradeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.side, self.shares, self.ticker)
    }
}

/// On the wire: `{"action": "BUY" | "SELL" | "HOLD", "ticker", "shares"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderWire", into = "OrderWire")]
pub enum Order {
    Hold,
    Trade(TradeOrder),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
enum OrderWire {
    Hold,
    Buy { ticker: Ticker, shares: u64 },
    Sell { ticker: Ticker, shares: u64 },
}

impl From<OrderWire> for Order {
    fn from(wire: OrderWire) -> Self {
        match wire {
            OrderWire::Hold => Order::Hold,
            OrderWire::Buy { ticker, shares } => Order::buy(ticker, shares),
            OrderWire::Sell { ticker, shares } => Order::sell(ticker, shares),
        }
    }
}

impl From<Order> for OrderWire {
    fn from(order: Order) -> Self {
        match order {
            Order::Hold => OrderWire::Hold,
            Order::Trade(TradeOrder { side: Side::Buy, ticker, shares }) => OrderWire::Buy { ticker, shares },
            Order::Trade(TradeOrder { side: Side::Sell, ticker, shares }) => OrderWire::Sell { ticker, shares },
        }
    }
}

impl Order {
    pub fn buy(ticker: Ticker, shares: u64) -> Self {
        Order::Trade(TradeOrder::buy(ticker, shares))
    }

    pub fn sell(ticker: Ticker, shares: u64) -> Self {
        Order::Trade(TradeOrder::sell(ticker, shares))
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Order::Hold)
    }

    pub fn as_trade(&self) -> Option<&TradeOrder> {
        match self {
            Order::Hold => None,
            Order::Trade(order) => Some(order),
        }
    }
}
