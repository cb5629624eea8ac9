//! Scenario files replayed by `tiltledger simulate`.
//!
//! ```toml
//! [[markets]]
//! name = "election"
//! outcomes = 2
//! feed = "election-2028"
//! maker = "mm"
//! prices = ["0.6", "0.4"]
//!
//! [[steps]]
//! action = "deposit"
//! account = "alice"
//! amount = "100"
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{AccountId, Amount, Direction, MarketParams, Side};
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub markets: Vec<MarketSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A market created before the first step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketSpec {
    /// Name steps refer to the market by.
    pub name: String,
    pub outcomes: u32,
    /// Oracle feed; a market without one never resolves.
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(default)]
    pub synthetic_collateral: Amount,
    #[serde(default)]
    pub expanding: bool,
    /// Back prices per outcome for the fixed-price engine. Uniform when
    /// omitted and a maker is set.
    #[serde(default)]
    pub prices: Option<Vec<Decimal>>,
    /// Per-share price impact applied after each engine trade.
    #[serde(default)]
    pub impact: Decimal,
}

impl MarketSpec {
    #[must_use]
    pub fn params(&self) -> MarketParams {
        let mut params = match &self.feed {
            Some(feed) => MarketParams::resolving(self.outcomes, feed.clone()),
            None => MarketParams::perpetual(self.outcomes),
        };
        if let Some(maker) = &self.maker {
            params = params.with_maker(AccountId::from(maker.as_str()));
        }
        params = params.with_synthetic_collateral(self.synthetic_collateral);
        if self.expanding {
            params = params.expanding();
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        account: String,
        amount: Amount,
    },
    Withdraw {
        account: String,
        amount: Amount,
    },
    Buy {
        account: String,
        market: String,
        outcome: u32,
        #[serde(default = "default_side")]
        side: Side,
        size: Amount,
        #[serde(default)]
        limit: Option<Amount>,
    },
    Sell {
        account: String,
        market: String,
        outcome: u32,
        #[serde(default = "default_side")]
        side: Side,
        size: Amount,
        #[serde(default)]
        limit: Option<Amount>,
    },
    Transfer {
        from: String,
        to: String,
        market: String,
        outcome: u32,
        #[serde(default = "default_side")]
        side: Side,
        amount: Amount,
    },
    AddOutcome {
        market: String,
    },
    /// Publish the oracle result for a market's feed.
    Publish {
        market: String,
        outcome: u32,
    },
    Touch {
        account: String,
    },
    Claim {
        account: String,
        markets: Vec<String>,
    },
    Rebalance {
        account: String,
        market: String,
    },
    Intent {
        id: String,
        maker: String,
        market: String,
        outcome: u32,
        #[serde(default = "default_side")]
        side: Side,
        direction: Direction,
        size: Amount,
        price: Decimal,
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
    },
    Fill {
        id: String,
        taker: String,
        size: Amount,
    },
    Cancel {
        id: String,
        account: String,
    },
}

const fn default_side() -> Side {
    Side::Back
}

impl Step {
    /// Short label used in output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::Buy { .. } => "buy",
            Self::Sell { .. } => "sell",
            Self::Transfer { .. } => "transfer",
            Self::AddOutcome { .. } => "add_outcome",
            Self::Publish { .. } => "publish",
            Self::Touch { .. } => "touch",
            Self::Claim { .. } => "claim",
            Self::Rebalance { .. } => "rebalance",
            Self::Intent { .. } => "intent",
            Self::Fill { .. } => "fill",
            Self::Cancel { .. } => "cancel",
        }
    }
}

impl Scenario {
    /// Parse a scenario from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or two markets share a name.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        for (i, market) in scenario.markets.iter().enumerate() {
            if scenario.markets[..i].iter().any(|m| m.name == market.name) {
                return Err(ConfigError::InvalidValue {
                    field: "markets.name",
                    reason: format!("duplicate market '{}'", market.name),
                }
                .into());
            }
        }
        Ok(scenario)
    }

    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_markets_and_steps() {
        let scenario = Scenario::parse_toml(
            r#"
[[markets]]
name = "cup"
outcomes = 3
feed = "cup-final"
maker = "mm"

[[steps]]
action = "deposit"
account = "alice"
amount = "25.5"

[[steps]]
action = "buy"
account = "alice"
market = "cup"
outcome = 1
side = "lay"
size = "10"
limit = "8"
"#,
        )
        .unwrap();

        assert_eq!(scenario.markets.len(), 1);
        let params = scenario.markets[0].params();
        assert!(params.does_resolve);
        assert_eq!(params.designated_maker, Some(AccountId::from("mm")));
        assert_eq!(
            scenario.steps[0],
            Step::Deposit {
                account: "alice".into(),
                amount: dec!(25.5)
            }
        );
        assert!(matches!(
            &scenario.steps[1],
            Step::Buy { side: Side::Lay, limit: Some(l), .. } if *l == dec!(8)
        ));
    }

    #[test]
    fn market_without_feed_is_perpetual() {
        let scenario = Scenario::parse_toml(
            r#"
[[markets]]
name = "tag"
outcomes = 2
maker = "mm"
synthetic_collateral = "50"
expanding = true
"#,
        )
        .unwrap();
        let params = scenario.markets[0].params();
        assert!(!params.does_resolve);
        assert!(params.expanding);
        assert_eq!(params.synthetic_collateral, dec!(50));
    }

    #[test]
    fn duplicate_market_names_are_rejected() {
        let result = Scenario::parse_toml(
            r#"
[[markets]]
name = "a"
outcomes = 2

[[markets]]
name = "a"
outcomes = 3
"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "markets.name", .. }))
        ));
    }

    #[test]
    fn unknown_action_is_a_parse_error() {
        let result = Scenario::parse_toml("[[steps]]\naction = \"explode\"\n");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
