//! Crews and the tradable ticker universe of a bot.

use crate::account::Account;
use crate::market::MarketState;
use crate::types::Ticker;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Named ticker subsets. A bot with a crew only trades that crew's members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewDirectory {
    crews: BTreeMap<String, Vec<Ticker>>,
}

impl CrewDirectory {
    pub fn new(crews: BTreeMap<String, Vec<Ticker>>) -> Self {
        Self { crews }
    }

    pub fn members(&self, crew: &str) -> &[Ticker] {
        self.crews.get(crew).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Priced tickers `account` may trade, in ticker order.
    /// An unknown crew yields an empty universe.
    pub fn tradable(&self, account: &Account, market: &MarketState) -> Vec<Ticker> {
        match account.bot_crew.as_deref() {
            None => market.tickers().cloned().collect(),
            Some(crew) => self
                .members(crew)
                .iter()
                .filter(|t| market.price(t).is_some())
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::Personality;
    use crate::types::{AccountId, Cash, Price, Timestamp};
    use rust_decimal_macros::dec;

    fn market() -> MarketState {
        let mut market = MarketState::new();
        for t in ["LUFY", "ZORO", "NAMI"] {
            market.seed_ticker(Ticker::from(t), Price::new_unchecked(dec!(10)), Timestamp::from_millis(0));
        }
        market
    }

    fn directory() -> CrewDirectory {
        let mut crews = BTreeMap::new();
        crews.insert(
            "strawhats".to_string(),
            vec![Ticker::from("ZORO"), Ticker::from("LUFY"), Ticker::from("USOP")],
        );
        crews.insert("marines".to_string(), vec![Ticker::from("GARP")]);
        CrewDirectory::new(crews)
    }

    fn bot() -> Account {
        Account::new_bot(AccountId::from("bot"), Cash::new(dec!(100)), Personality::Random)
    }

    #[test]
    fn no_crew_trades_everything() {
        let universe = directory().tradable(&bot(), &market());
        assert_eq!(universe.len(), 3);
    }

    #[test]
    fn crew_intersects_with_priced_tickers() {
        let universe = directory().tradable(&bot().with_crew("strawhats"), &market());
        assert_eq!(universe, vec![Ticker::from("LUFY"), Ticker::from("ZORO")]);
    }

    #[test]
    fn empty_intersection_and_unknown_crew() {
        assert!(directory().tradable(&bot().with_crew("marines"), &market()).is_empty());
        assert!(directory().tradable(&bot().with_crew("ghosts"), &market()).is_empty());
    }
}
