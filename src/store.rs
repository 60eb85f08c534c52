//! Transactional document store.
//!
//! A transaction reads fresh copies of one account record and the market
//! record, lets the caller mutate them, and commits both only if neither
//! record changed underneath it. On a write conflict the whole read-modify-write
//! is retried up to a bounded number of attempts.

use crate::account::Account;
use crate::market::MarketState;
use crate::types::AccountId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// What a transaction body wants done with its copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome<T> {
    /// Write both records back.
    Commit(T),
    /// Discard the copies. Nothing is written.
    Rollback(T),
}

pub trait MarketStore: Send + Sync {
    fn market(&self) -> Result<MarketState, StoreError>;

    fn account(&self, id: &AccountId) -> Result<Account, StoreError>;

    /// All accounts with a bot personality, in id order.
    fn bot_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Atomic read-modify-write over one account and the market.
    /// `f` may run more than once and must only touch its arguments.
    fn transact<T, F>(&self, id: &AccountId, f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Account, &mut MarketState) -> TxOutcome<T>;

    /// Atomic read-modify-write over the market alone.
    fn transact_market<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut MarketState) -> TxOutcome<T>;
}

#[derive(Debug, Clone)]
struct Versioned<D> {
    version: u64,
    doc: D,
}

impl<D: Clone> Versioned<D> {
    fn new(doc: D) -> Self {
        Self { version: 0, doc }
    }

    fn snapshot(&self) -> (u64, D) {
        (self.version, self.doc.clone())
    }

    fn replace(&mut self, doc: D) {
        self.doc = doc;
        self.version += 1;
    }
}

/// Process-local store. Lock order is always market then accounts.
#[derive(Debug)]
pub struct InMemoryStore {
    market: RwLock<Versioned<MarketState>>,
    accounts: RwLock<BTreeMap<AccountId, Versioned<Account>>>,
    max_attempts: u32,
    conflicts: AtomicU64,
}

impl InMemoryStore {
    pub fn new(market: MarketState, max_attempts: u32) -> Self {
        Self {
            market: RwLock::new(Versioned::new(market)),
            accounts: RwLock::new(BTreeMap::new()),
            max_attempts: max_attempts.max(1),
            conflicts: AtomicU64::new(0),
        }
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts
            .write()
            .insert(account.id.clone(), Versioned::new(account));
    }

    pub fn set_halted(&self, halted: bool) -> Result<(), StoreError> {
        self.transact_market(|market| {
            market.market_halted = halted;
            TxOutcome::Commit(())
        })
    }

    pub fn market_version(&self) -> u64 {
        self.market.read().version
    }

    /// Commits that lost a race and had to be retried, since creation.
    pub fn conflict_count(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    fn read_account(&self, id: &AccountId) -> Result<(u64, Account), StoreError> {
        self.accounts
            .read()
            .get(id)
            .map(Versioned::snapshot)
            .ok_or_else(|| StoreError::AccountNotFound(id.clone()))
    }

    fn note_conflict(&self, attempt: u32) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
        debug!(attempt, "write conflict, retrying transaction");
    }
}

impl MarketStore for InMemoryStore {
    fn market(&self) -> Result<MarketState, StoreError> {
        Ok(self.market.read().doc.clone())
    }

    fn account(&self, id: &AccountId) -> Result<Account, StoreError> {
        self.read_account(id).map(|(_, account)| account)
    }

    fn bot_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .values()
            .filter(|v| v.doc.is_bot())
            .map(|v| v.doc.clone())
            .collect())
    }

    fn transact<T, F>(&self, id: &AccountId, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Account, &mut MarketState) -> TxOutcome<T>,
    {
        for attempt in 1..=self.max_attempts {
            let (market_version, mut market) = self.market.read().snapshot();
            let (account_version, mut account) = self.read_account(id)?;

            let value = match f(&mut account, &mut market) {
                TxOutcome::Rollback(value) => return Ok(value),
                TxOutcome::Commit(value) => value,
            };

            let mut market_slot = self.market.write();
            let mut accounts = self.accounts.write();
            let account_slot = accounts
                .get_mut(id)
                .ok_or_else(|| StoreError::AccountNotFound(id.clone()))?;

            if market_slot.version != market_version || account_slot.version != account_version {
                drop(accounts);
                drop(market_slot);
                self.note_conflict(attempt);
                continue;
            }

            market_slot.replace(market);
            account_slot.replace(account);
            return Ok(value);
        }

        Err(StoreError::Conflict {
            attempts: self.max_attempts,
        })
    }

    fn transact_market<T, F>(&self, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut MarketState) -> TxOutcome<T>,
    {
        for attempt in 1..=self.max_attempts {
            let (version, mut market) = self.market.read().snapshot();

            let value = match f(&mut market) {
                TxOutcome::Rollback(value) => return Ok(value),
                TxOutcome::Commit(value) => value,
            };

            let mut slot = self.market.write();
            if slot.version != version {
                drop(slot);
                self.note_conflict(attempt);
                continue;
            }
            slot.replace(market);
            return Ok(value);
        }

        Err(StoreError::Conflict {
            attempts: self.max_attempts,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Transaction gave up after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cash, Price, Ticker, Timestamp};
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn test_store(max_attempts: u32) -> InMemoryStore {
        let mut market = MarketState::new();
        market.seed_ticker(Ticker::from("ACE"), Price::new_unchecked(dec!(10)), Timestamp::from_millis(0));
        let store = InMemoryStore::new(market, max_attempts);
        store.insert_account(Account::new(AccountId::from("alice"), Cash::new(dec!(100))));
        store
    }

    #[test]
    fn commit_writes_both_records() {
        let store = test_store(3);
        let id = AccountId::from("alice");

        store
            .transact(&id, |account, market| {
                account.cash = Cash::new(dec!(90));
                market.market_halted = true;
                TxOutcome::Commit(())
            })
            .unwrap();

        assert_eq!(store.account(&id).unwrap().cash.value(), dec!(90));
        assert!(store.market().unwrap().market_halted);
        assert_eq!(store.market_version(), 1);
    }

    #[test]
    fn rollback_writes_nothing() {
        let store = test_store(3);
        let id = AccountId::from("alice");

        let out = store
            .transact(&id, |account, _market| {
                account.cash = Cash::zero();
                TxOutcome::Rollback(7)
            })
            .unwrap();

        assert_eq!(out, 7);
        assert_eq!(store.account(&id).unwrap().cash.value(), dec!(100));
        assert_eq!(store.market_version(), 0);
    }

    #[test]
    fn conflict_is_retried() {
        let store = test_store(3);
        let id = AccountId::from("alice");
        let calls = Cell::new(0);

        store
            .transact(&id, |account, _market| {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    // someone else commits between our read and our write
                    store.set_halted(true).unwrap();
                }
                account.cash = Cash::new(dec!(1));
                TxOutcome::Commit(())
            })
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(store.conflict_count(), 1);
        assert_eq!(store.account(&id).unwrap().cash.value(), dec!(1));
        // the retried body saw the competing write
        assert!(store.market().unwrap().market_halted);
    }

    #[test]
    fn conflict_gives_up_after_budget() {
        let store = test_store(2);
        let id = AccountId::from("alice");

        let result: Result<(), _> = store.transact(&id, |account, _market| {
            store.set_halted(true).unwrap();
            account.cash = Cash::zero();
            TxOutcome::Commit(())
        });

        assert_eq!(result, Err(StoreError::Conflict { attempts: 2 }));
        assert_eq!(store.account(&id).unwrap().cash.value(), dec!(100));
    }

    #[test]
    fn missing_account() {
        let store = test_store(1);
        let result = store.transact(&AccountId::from("ghost"), |_, _| TxOutcome::Commit(()));
        assert!(matches!(result, Err(StoreError::AccountNotFound(_))));
    }

    #[test]
    fn bot_listing_skips_humans() {
        let store = test_store(1);
        store.insert_account(Account::new_bot(
            AccountId::from("bot_b"),
            Cash::new(dec!(10)),
            crate::bot::Personality::Random,
        ));
        store.insert_account(Account::new_bot(
            AccountId::from("bot_a"),
            Cash::new(dec!(10)),
            crate::bot::Personality::Panic,
        ));

        let bots = store.bot_accounts().unwrap();
        let ids: Vec<&str> = bots.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["bot_a", "bot_b"]);
    }
}
