//! Oracle whose answers are published by hand.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::info;

use crate::domain::{MarketId, OutcomeId};
use crate::error::OracleError;
use crate::port::{Oracle, Resolution};

/// Feeds keyed by the oracle parameter string a market was created with.
#[derive(Debug, Default)]
pub struct ManualOracle {
    feeds: RwLock<HashMap<String, Option<OutcomeId>>>,
}

impl ManualOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a feed known, unresolved.
    pub fn register(&self, feed: impl Into<String>) {
        self.feeds.write().entry(feed.into()).or_insert(None);
    }

    /// Publish the winning outcome for a feed.
    pub fn publish(&self, feed: impl Into<String>, winning: OutcomeId) {
        let feed = feed.into();
        info!(feed = %feed, winning = %winning, "Oracle result published");
        self.feeds.write().insert(feed, Some(winning));
    }
}

impl Oracle for ManualOracle {
    fn resolution(&self, market: MarketId, params: &str) -> Result<Resolution, OracleError> {
        match self.feeds.read().get(params) {
            None => Err(OracleError::UnknownFeed { market }),
            Some(None) => Ok(Resolution::Pending),
            Some(Some(winning)) => Ok(Resolution::Resolved(*winning)),
        }
    }
}
