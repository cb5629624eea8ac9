//! `tiltledger simulate`: replay a scenario against an in-process exchange.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::output;
use super::scenario::{MarketSpec, Scenario, Step};
use super::SimulateArgs;
use crate::adapter::{FixedPriceEngine, InMemoryCustody, ManualOracle};
use crate::application::Exchange;
use crate::domain::{AccountId, Amount, Intent, IntentId, MarketId, OutcomeId};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::Config;
use crate::port::Custody;

/// Exchange wired to in-memory adapters plus the scenario's market names.
pub struct Simulation {
    exchange: Exchange,
    oracle: Arc<ManualOracle>,
    custody: Arc<InMemoryCustody>,
    markets: HashMap<String, MarketId>,
    names: Vec<(String, MarketId)>,
    applied: usize,
    rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReport {
    pub account: AccountId,
    pub free_collateral: Amount,
    pub pending_winnings: Amount,
    pub touched_markets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketReport {
    pub name: String,
    pub id: MarketId,
    pub outcomes: u32,
    pub winning_outcome: Option<OutcomeId>,
    pub value: Amount,
}

/// Final state after a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub applied: usize,
    pub rejected: usize,
    pub accounts: Vec<AccountReport>,
    pub markets: Vec<MarketReport>,
    pub total_markets_value: Amount,
    pub total_free_collateral: Amount,
    pub total_value_locked: Amount,
    pub custody_principal: Amount,
    pub balanced: bool,
}

impl Simulation {
    /// Build the exchange and create every scenario market.
    ///
    /// # Errors
    ///
    /// Returns an error if a market's parameters are invalid.
    pub fn new(config: &Config, scenario: &Scenario) -> Result<Self> {
        let oracle = Arc::new(ManualOracle::new());
        let custody = Arc::new(InMemoryCustody::new());
        let exchange = Exchange::from_config(config, oracle.clone(), custody.clone());
        let mut simulation = Self {
            exchange,
            oracle,
            custody,
            markets: HashMap::new(),
            names: Vec::new(),
            applied: 0,
            rejected: 0,
        };
        for spec in &scenario.markets {
            simulation.create_market(spec)?;
        }
        Ok(simulation)
    }

    fn create_market(&mut self, spec: &MarketSpec) -> Result<()> {
        let id = self.exchange.create_market(spec.params())?;
        if let Some(feed) = &spec.feed {
            self.oracle.register(feed.clone());
        }
        if spec.maker.is_some() {
            let engine = match &spec.prices {
                Some(prices) => FixedPriceEngine::new(
                    id,
                    prices
                        .iter()
                        .zip(0u32..)
                        .map(|(price, outcome)| (OutcomeId::new(outcome), *price)),
                ),
                None => FixedPriceEngine::uniform(id, spec.outcomes),
            };
            self.exchange
                .attach_engine(id, Arc::new(engine.with_impact(spec.impact)))?;
        }
        info!(market = %id, name = %spec.name, "Scenario market created");
        self.markets.insert(spec.name.clone(), id);
        self.names.push((spec.name.clone(), id));
        Ok(())
    }

    #[must_use]
    pub const fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    fn market(&self, name: &str) -> Result<MarketId> {
        self.markets.get(name).copied().ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "market",
                reason: format!("unknown market '{name}'"),
            }
            .into()
        })
    }

    fn feed(&self, market: MarketId) -> Result<String> {
        let state = self.exchange.ledger().market(market);
        match state.filter(|state| state.does_resolve()) {
            Some(state) => Ok(state.params().oracle_params.clone()),
            None => Err(ConfigError::InvalidValue {
                field: "market",
                reason: format!("market {market} has no oracle feed"),
            }
            .into()),
        }
    }

    /// Apply one step, returning a short description of its effect.
    ///
    /// # Errors
    ///
    /// Returns the exchange's rejection; the exchange is unchanged then.
    pub fn apply(&mut self, step: &Step) -> Result<String> {
        let detail = match step {
            Step::Deposit { account, amount } => {
                self.exchange.deposit(&account.as_str().into(), *amount)?;
                format!("{account} +{amount}")
            }
            Step::Withdraw { account, amount } => {
                self.exchange.withdraw(&account.as_str().into(), *amount)?;
                format!("{account} -{amount}")
            }
            Step::Buy {
                account,
                market,
                outcome,
                side,
                size,
                limit,
            } => {
                let id = self.market(market)?;
                let receipt = self.exchange.buy(
                    &account.as_str().into(),
                    id,
                    OutcomeId::new(*outcome),
                    *side,
                    *size,
                    *limit,
                )?;
                format!("{account} bought {size} {side} #{outcome} in {market} for {}", receipt.cost)
            }
            Step::Sell {
                account,
                market,
                outcome,
                side,
                size,
                limit,
            } => {
                let id = self.market(market)?;
                let receipt = self.exchange.sell(
                    &account.as_str().into(),
                    id,
                    OutcomeId::new(*outcome),
                    *side,
                    *size,
                    *limit,
                )?;
                format!("{account} sold {size} {side} #{outcome} in {market} for {}", receipt.cost)
            }
            Step::Transfer {
                from,
                to,
                market,
                outcome,
                side,
                amount,
            } => {
                let id = self.market(market)?;
                self.exchange.transfer(
                    &from.as_str().into(),
                    &to.as_str().into(),
                    id,
                    OutcomeId::new(*outcome),
                    *side,
                    *amount,
                )?;
                format!("{from} -> {to} {amount} {side} #{outcome} in {market}")
            }
            Step::AddOutcome { market } => {
                let id = self.market(market)?;
                let outcome = self.exchange.add_outcome(id)?;
                format!("{market} gained outcome #{outcome}")
            }
            Step::Publish { market, outcome } => {
                let id = self.market(market)?;
                let feed = self.feed(id)?;
                self.oracle.publish(feed, OutcomeId::new(*outcome));
                format!("{market} resolves to #{outcome}")
            }
            Step::Touch { account } => {
                let credited = self.exchange.touch(&account.as_str().into());
                format!("{account} credited {credited}")
            }
            Step::Claim { account, markets } => {
                let ids = markets
                    .iter()
                    .map(|name| self.market(name))
                    .collect::<Result<Vec<_>>>()?;
                let claimed = self.exchange.claim(&account.as_str().into(), &ids)?;
                format!("{account} claimed {claimed}")
            }
            Step::Rebalance { account, market } => {
                let id = self.market(market)?;
                let capital = self.exchange.rebalance(&account.as_str().into(), id)?;
                format!("{account} in {market}: {capital:?}")
            }
            Step::Intent {
                id,
                maker,
                market,
                outcome,
                side,
                direction,
                size,
                price,
                expires_at,
            } => {
                let intent = Intent {
                    id: IntentId::from(id.as_str()),
                    maker: maker.as_str().into(),
                    market: self.market(market)?,
                    outcome: OutcomeId::new(*outcome),
                    side: *side,
                    direction: *direction,
                    size: *size,
                    price: *price,
                    expires_at: *expires_at,
                };
                self.exchange.submit_intent(intent)?;
                format!("{maker} {direction}s {size} {side} #{outcome} in {market} at {price}")
            }
            Step::Fill { id, taker, size } => {
                let receipt = self.exchange.fill_intent(
                    &IntentId::from(id.as_str()),
                    &taker.as_str().into(),
                    *size,
                )?;
                format!("{taker} filled {size} of {id} for {}", receipt.cost)
            }
            Step::Cancel { id, account } => {
                self.exchange
                    .cancel_intent(&IntentId::from(id.as_str()), &account.as_str().into())?;
                format!("{id} cancelled")
            }
        };
        Ok(detail)
    }

    /// Replay every step, printing each result.
    ///
    /// # Errors
    ///
    /// With `strict`, returns the first rejection.
    pub fn run(&mut self, steps: &[Step], strict: bool) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            match self.apply(step) {
                Ok(detail) => {
                    self.applied += 1;
                    output::step(index + 1, step.label(), Ok(&detail));
                }
                Err(error) => {
                    self.rejected += 1;
                    output::step(index + 1, step.label(), Err(&error.to_string()));
                    if strict {
                        return Err(error);
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn report(&self) -> SimulationReport {
        let ledger = self.exchange.ledger();
        let sheet = ledger.balance_sheet();

        let mut accounts: Vec<AccountReport> = ledger
            .accounts()
            .map(|account| AccountReport {
                account: account.clone(),
                free_collateral: ledger.free_collateral(account),
                pending_winnings: ledger.pending_winnings(account),
                touched_markets: ledger.touched_markets(account).len(),
            })
            .collect();
        accounts.sort_by(|a, b| a.account.cmp(&b.account));

        let markets = self
            .names
            .iter()
            .filter_map(|(name, id)| {
                ledger.market(*id).map(|state| MarketReport {
                    name: name.clone(),
                    id: *id,
                    outcomes: state.outcome_count(),
                    winning_outcome: state.winning_outcome(),
                    value: sheet.market_value(*id),
                })
            })
            .collect();

        SimulationReport {
            applied: self.applied,
            rejected: self.rejected,
            accounts,
            markets,
            total_markets_value: sheet.total_markets_value(),
            total_free_collateral: sheet.total_free_collateral(),
            total_value_locked: sheet.total_value_locked(),
            custody_principal: self.custody.principal(),
            balanced: sheet.is_balanced(),
        }
    }
}

fn print_report(report: &SimulationReport) -> Result<()> {
    if output::is_json() {
        output::json_document("report", serde_json::to_value(report)?);
        return Ok(());
    }

    output::section("Accounts");
    for account in &report.accounts {
        output::field(
            account.account.as_str(),
            format!(
                "free {} pending {} markets {}",
                account.free_collateral, account.pending_winnings, account.touched_markets
            ),
        );
    }

    output::section("Markets");
    for market in &report.markets {
        let status = market
            .winning_outcome
            .map_or_else(|| "open".to_string(), |winning| format!("won by #{winning}"));
        output::field(
            &market.name,
            format!("{} outcomes, {status}, value {}", market.outcomes, market.value),
        );
    }

    output::section("Balance sheet");
    output::field("markets value", report.total_markets_value);
    output::field("free collateral", report.total_free_collateral);
    output::field("value locked", report.total_value_locked);
    output::field("custody", report.custody_principal);
    if report.balanced {
        output::success(&format!(
            "{} steps applied, {} rejected, books balance",
            report.applied, report.rejected
        ));
    } else {
        output::warning("balance sheet does not balance");
    }
    Ok(())
}

/// Execute the `simulate` command.
///
/// # Errors
///
/// Returns an error if the config or scenario cannot be loaded, or, with
/// `--strict`, the first rejected step.
pub fn execute(args: &SimulateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let scenario = Scenario::load(&args.scenario)?;

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Steps");
    let mut simulation = Simulation::new(&config, &scenario)?;
    let outcome = simulation.run(&scenario.steps, args.strict);
    print_report(&simulation.report())?;
    outcome
}
