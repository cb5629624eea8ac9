//! Exchange fixture over the in-memory adapters.

use std::sync::Arc;

use crate::adapter::{FixedPriceEngine, InMemoryCustody, ManualOracle};
use crate::application::Exchange;
use crate::domain::{MarketId, MarketParams};
use crate::ledger::LedgerSettings;

/// An exchange plus the adapters behind it.
pub struct TestExchange {
    pub exchange: Exchange,
    pub oracle: Arc<ManualOracle>,
    pub custody: Arc<InMemoryCustody>,
}

impl TestExchange {
    pub fn new(settings: LedgerSettings) -> Self {
        let oracle = Arc::new(ManualOracle::new());
        let custody = Arc::new(InMemoryCustody::new());
        let exchange = Exchange::new(settings, oracle.clone(), custody.clone());
        Self {
            exchange,
            oracle,
            custody,
        }
    }

    /// Create a market with a uniform fixed-price engine, registering its
    /// oracle feed if it resolves.
    ///
    /// # Panics
    ///
    /// Panics if the parameters are invalid.
    pub fn market(&mut self, params: MarketParams) -> MarketId {
        if params.does_resolve {
            self.oracle.register(params.oracle_params.clone());
        }
        let outcomes = params.outcomes;
        let market = self
            .exchange
            .create_market(params)
            .expect("valid market params");
        self.exchange
            .attach_engine(market, Arc::new(FixedPriceEngine::uniform(market, outcomes)))
            .expect("market exists");
        market
    }
}

impl Default for TestExchange {
    fn default() -> Self {
        Self::new(LedgerSettings::default())
    }
}
