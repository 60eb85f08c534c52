// 11.0: every bot round outcome produces an event. used for audit trails and for
// tests that need to see what a round did. the EventPayload enum lists all event types.

use crate::account::TradeRecord;
use crate::order::TradeOrder;
use crate::settlement::SkipReason;
use crate::types::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Trade events
    TradeSettled(TradeSettledEvent),
    OrderSkipped(OrderSkippedEvent),

    // Bot events
    BotHeld(BotHeldEvent),
    BotFailed(BotFailedEvent),

    // Round events
    RoundSkipped(RoundSkippedEvent),
    RoundCompleted(RoundCompletedEvent),

    // Market data events
    PriceHistoryRecorded(PriceHistoryRecordedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSettledEvent {
    pub account_id: AccountId,
    pub record: TradeRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSkippedEvent {
    pub account_id: AccountId,
    pub order: TradeOrder,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotHeldEvent {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotFailedEvent {
    pub account_id: AccountId,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundSkipReason {
    Maintenance,
    MarketHalted,
    NoBots,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSkippedEvent {
    pub reason: RoundSkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCompletedEvent {
    pub cohort: usize,
    pub trades: usize,
    pub holds: usize,
    pub skips: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryRecordedEvent {
    pub tickers: usize,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Keeps the most recent `max_events` events. Ids keep counting across evictions.
#[derive(Debug)]
pub struct EventCollector {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventCollector {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events: max_events.max(1),
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Build and store an event in one step.
    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) {
        let id = self.next_id();
        self.emit(Event::new(id, timestamp, payload));
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }
}
