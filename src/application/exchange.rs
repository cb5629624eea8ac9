//! Exchange service.
//!
//! Wraps the [`Ledger`] with the outside world: custody for principal, a
//! price engine per market for trades against the designated maker, and the
//! oracle for resolution. Every operation that touches an account first
//! polls the oracle for a bounded number of that account's markets, so
//! winnings can be folded in lazily.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{
    AccountId, Amount, Direction, Intent, IntentId, MarketId, MarketParams, OutcomeId, Side,
    TradeRequest,
};
use crate::error::{LedgerError, PricingError, Result};
use crate::infrastructure::config::Config;
use crate::ledger::{CapitalMove, Ledger, LedgerSettings, SettlementReceipt, SettlementRequest};
use crate::port::{Custody, Oracle, PriceEngine, Resolution};

/// Default oracle lookups per touch.
pub const DEFAULT_RESOLVE_BUDGET: usize = 4;

pub struct Exchange {
    ledger: Ledger,
    engines: HashMap<MarketId, Arc<dyn PriceEngine>>,
    oracle: Arc<dyn Oracle>,
    custody: Arc<dyn Custody>,
    resolve_budget: usize,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("markets", &self.ledger.markets().count())
            .field("engines", &self.engines.len())
            .field("resolve_budget", &self.resolve_budget)
            .finish_non_exhaustive()
    }
}

impl Exchange {
    #[must_use]
    pub fn new(
        settings: LedgerSettings,
        oracle: Arc<dyn Oracle>,
        custody: Arc<dyn Custody>,
    ) -> Self {
        Self {
            ledger: Ledger::new(settings),
            engines: HashMap::new(),
            oracle,
            custody,
            resolve_budget: DEFAULT_RESOLVE_BUDGET,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config, oracle: Arc<dyn Oracle>, custody: Arc<dyn Custody>) -> Self {
        Self::new(config.ledger_settings(), oracle, custody)
            .with_resolve_budget(config.resolve_budget())
    }

    #[must_use]
    pub fn with_resolve_budget(mut self, budget: usize) -> Self {
        self.resolve_budget = budget;
        self
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Direct ledger access for administrative tooling.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    #[must_use]
    pub fn custody_principal(&self) -> Amount {
        self.custody.principal()
    }

    // ---------------------------------------------------------------------
    // Markets
    // ---------------------------------------------------------------------

    /// Create a market.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid.
    pub fn create_market(&mut self, params: MarketParams) -> Result<MarketId> {
        Ok(self.ledger.create_market(params)?)
    }

    /// Install the price engine used for trades in `market`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` if the market does not exist.
    pub fn attach_engine(&mut self, market: MarketId, engine: Arc<dyn PriceEngine>) -> Result<()> {
        self.ledger.market_ref(market)?;
        info!(market = %market, engine = engine.name(), "Price engine attached");
        self.engines.insert(market, engine);
        Ok(())
    }

    /// Grow a market's outcome set.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown or resolved.
    pub fn add_outcome(&mut self, market: MarketId) -> Result<OutcomeId> {
        Ok(self.ledger.add_outcome(market)?)
    }

    /// Ask the oracle about `market` and record a published result.
    ///
    /// Returns the winning outcome once resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown or perpetual, the oracle
    /// has no feed, or the reported outcome does not exist.
    pub fn resolve(&mut self, market: MarketId) -> Result<Option<OutcomeId>> {
        let state = self.ledger.market_ref(market)?;
        if let Some(winning) = state.winning_outcome() {
            return Ok(Some(winning));
        }
        if !state.does_resolve() {
            return Err(LedgerError::MarketNotResolvable { market }.into());
        }
        match self.oracle.resolution(market, &state.params().oracle_params)? {
            Resolution::Pending => Ok(None),
            Resolution::Resolved(winning) => {
                if !state.has_outcome(winning) {
                    return Err(crate::error::OracleError::InvalidOutcome {
                        market,
                        outcome: winning,
                    }
                    .into());
                }
                self.ledger.resolve_market(market, winning)?;
                Ok(Some(winning))
            }
        }
    }

    /// Poll the oracle for up to the resolve budget of the account's
    /// unresolved markets. Oracle failures are logged and skipped.
    fn poll_resolutions(&mut self, account: &AccountId) {
        let pending: Vec<MarketId> = self
            .ledger
            .touched_markets(account)
            .iter()
            .rev()
            .copied()
            .filter(|market| {
                self.ledger
                    .market(*market)
                    .is_some_and(|state| state.does_resolve() && !state.is_resolved())
            })
            .take(self.resolve_budget)
            .collect();

        for market in pending {
            if let Err(error) = self.resolve(market) {
                warn!(market = %market, error = %error, "Resolution lookup failed");
            }
        }
    }

    /// Fold in resolved winnings for the account, within budgets.
    ///
    /// Returns the amount credited.
    pub fn touch(&mut self, account: &AccountId) -> Amount {
        self.poll_resolutions(account);
        self.ledger.apply_pending_winnings(account)
    }

    /// Claim specific markets, bypassing budgets.
    ///
    /// # Errors
    ///
    /// Returns `UnknownMarket` if any id is unknown.
    pub fn claim(&mut self, account: &AccountId, markets: &[MarketId]) -> Result<Amount> {
        for market in markets {
            if self
                .ledger
                .market(*market)
                .is_some_and(|state| state.does_resolve() && !state.is_resolved())
            {
                if let Err(error) = self.resolve(*market) {
                    warn!(market = %market, error = %error, "Resolution lookup failed");
                }
            }
        }
        Ok(self.ledger.batch_claim(account, markets)?)
    }

    // ---------------------------------------------------------------------
    // Capital
    // ---------------------------------------------------------------------

    /// Take principal into custody and credit it as free collateral.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive amount or if custody refuses.
    pub fn deposit(&mut self, account: &AccountId, amount: Amount) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { amount }.into());
        }
        self.custody.deposit_principal(amount)?;
        self.ledger.deposit(account, amount)?;
        self.touch(account);
        Ok(())
    }

    /// Release principal, claiming resolved winnings first if free
    /// collateral alone does not cover `amount`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFreeCollateral` if even the hard claim path
    /// cannot cover the amount, or a custody error.
    pub fn withdraw(&mut self, account: &AccountId, amount: Amount) -> Result<()> {
        self.poll_resolutions(account);
        let plan = self.ledger.prepare_withdrawal(account, amount).map_err(|error| {
            warn!(account = %account, amount = %amount, error = %error, "Withdrawal rejected");
            error
        })?;
        self.custody.withdraw_principal(amount)?;
        self.ledger.commit_withdrawal(account, amount, &plan);
        Ok(())
    }

    /// Allocate or release capital so the pair holds exactly what it needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is unknown or resolved, or free
    /// collateral cannot cover a shortfall.
    pub fn rebalance(&mut self, account: &AccountId, market: MarketId) -> Result<CapitalMove> {
        self.poll_resolutions(account);
        Ok(self.ledger.rebalance_full(account, market)?)
    }

    // ---------------------------------------------------------------------
    // Trading
    // ---------------------------------------------------------------------

    /// Price a trade without executing it.
    ///
    /// # Errors
    ///
    /// Returns `PricingError` if no engine is attached or pricing fails.
    pub fn quote(&self, trade: &TradeRequest) -> Result<Amount> {
        let engine = self
            .engines
            .get(&trade.market)
            .ok_or(PricingError::MissingEngine {
                market: trade.market,
            })?;
        Ok(engine.quote(trade)?)
    }

    /// Buy exposure from the market's designated maker.
    ///
    /// `max_cost` rejects the trade if the quote is higher.
    ///
    /// # Errors
    ///
    /// Returns an error if the trade cannot be priced, breaches the limit,
    /// or fails settlement.
    pub fn buy(
        &mut self,
        account: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        size: Amount,
        max_cost: Option<Amount>,
    ) -> Result<SettlementReceipt> {
        let trade = TradeRequest::new(market, outcome, side, Direction::Buy, size);
        self.trade(account, &trade, max_cost)
    }

    /// Sell exposure to the market's designated maker.
    ///
    /// `min_proceeds` rejects the trade if the quote is lower.
    ///
    /// # Errors
    ///
    /// See [`Exchange::buy`].
    pub fn sell(
        &mut self,
        account: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        size: Amount,
        min_proceeds: Option<Amount>,
    ) -> Result<SettlementReceipt> {
        let trade = TradeRequest::new(market, outcome, side, Direction::Sell, size);
        self.trade(account, &trade, min_proceeds)
    }

    fn trade(
        &mut self,
        account: &AccountId,
        trade: &TradeRequest,
        limit: Option<Amount>,
    ) -> Result<SettlementReceipt> {
        let maker = self
            .ledger
            .market_ref(trade.market)?
            .designated_maker()
            .cloned()
            .ok_or(LedgerError::NoDesignatedMaker {
                market: trade.market,
            })?;
        self.poll_resolutions(account);
        self.poll_resolutions(&maker);

        let engine = self
            .engines
            .get(&trade.market)
            .cloned()
            .ok_or(PricingError::MissingEngine {
                market: trade.market,
            })?;
        let cost = engine.quote(trade)?;
        if let Some(limit) = limit {
            let breached = if trade.direction.is_buy() {
                cost > limit
            } else {
                cost < limit
            };
            if breached {
                warn!(market = %trade.market, quoted = %cost, limit = %limit, "Quote outside limit");
                return Err(LedgerError::SlippageExceeded {
                    quoted: cost,
                    limit,
                }
                .into());
            }
        }

        let (seller, buyer) = if trade.direction.is_buy() {
            (maker, account.clone())
        } else {
            (account.clone(), maker)
        };
        let receipt = self
            .ledger
            .settle(&SettlementRequest {
                market: trade.market,
                outcome: trade.outcome,
                side: trade.side,
                size: trade.size,
                seller,
                buyer,
                cost,
            })
            .map_err(|error| {
                warn!(account = %account, market = %trade.market, error = %error, "Trade rejected");
                error
            })?;
        engine.commit(trade, cost);
        Ok(receipt)
    }

    /// Move exposure between accounts with no cash leg.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails settlement.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        market: MarketId,
        outcome: OutcomeId,
        side: Side,
        amount: Amount,
    ) -> Result<SettlementReceipt> {
        self.poll_resolutions(from);
        self.poll_resolutions(to);
        Ok(self
            .ledger
            .transfer(from, to, market, outcome, side, amount)?)
    }

    // ---------------------------------------------------------------------
    // Intents
    // ---------------------------------------------------------------------

    /// Register a signed intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent is invalid or a duplicate.
    pub fn submit_intent(&mut self, intent: Intent) -> Result<IntentId> {
        Ok(self.ledger.submit_intent(intent)?)
    }

    /// Cancel an intent on behalf of its maker.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent is unknown, not the account's, or
    /// already cancelled.
    pub fn cancel_intent(&mut self, id: &IntentId, account: &AccountId) -> Result<()> {
        Ok(self.ledger.cancel_intent(id, account)?)
    }

    /// Fill part of an intent as `taker`.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent cannot be filled or settlement fails.
    pub fn fill_intent(
        &mut self,
        id: &IntentId,
        taker: &AccountId,
        size: Amount,
    ) -> Result<SettlementReceipt> {
        if let Some((intent, _)) = self.ledger.intents().get(id) {
            let maker = intent.maker.clone();
            self.poll_resolutions(&maker);
        }
        self.poll_resolutions(taker);
        Ok(self.ledger.fill_intent(id, taker, size, Utc::now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FixedPriceEngine, InMemoryCustody, ManualOracle};
    use crate::error::Error;
    use rust_decimal_macros::dec;

    struct Fixture {
        exchange: Exchange,
        oracle: Arc<ManualOracle>,
        custody: Arc<InMemoryCustody>,
    }

    fn fixture() -> Fixture {
        let oracle = Arc::new(ManualOracle::new());
        let custody = Arc::new(InMemoryCustody::new());
        let exchange = Exchange::new(LedgerSettings::default(), oracle.clone(), custody.clone());
        Fixture {
            exchange,
            oracle,
            custody,
        }
    }

    fn maker() -> AccountId {
        AccountId::from("maker")
    }

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn amm_market(exchange: &mut Exchange, params: MarketParams) -> MarketId {
        let market = exchange.create_market(params.with_maker(maker())).unwrap();
        exchange
            .attach_engine(market, Arc::new(FixedPriceEngine::uniform(market, 2)))
            .unwrap();
        market
    }

    #[test]
    fn deposit_and_withdraw_go_through_custody() {
        let mut f = fixture();
        f.exchange.deposit(&alice(), dec!(50)).unwrap();
        assert_eq!(f.custody.principal(), dec!(50));
        f.exchange.withdraw(&alice(), dec!(20)).unwrap();
        assert_eq!(f.custody.principal(), dec!(30));
        assert_eq!(f.exchange.ledger().free_collateral(&alice()), dec!(30));

        let err = f.exchange.withdraw(&alice(), dec!(31)).unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::InsufficientFreeCollateral { .. })
        ));
        assert_eq!(f.custody.principal(), dec!(30));
    }

    #[test]
    fn buy_settles_against_designated_maker() {
        let mut f = fixture();
        f.oracle.register("feed");
        let market = amm_market(&mut f.exchange, MarketParams::resolving(2, "feed"));
        f.exchange.deposit(&maker(), dec!(100)).unwrap();
        f.exchange.deposit(&alice(), dec!(100)).unwrap();

        let receipt = f
            .exchange
            .buy(&alice(), market, OutcomeId::new(0), Side::Back, dec!(10), Some(dec!(5)))
            .unwrap();
        assert_eq!(receipt.cost, dec!(5));
        assert_eq!(receipt.seller.account, maker());
        assert_eq!(f.exchange.ledger().free_collateral(&alice()), dec!(95));
        assert_eq!(f.exchange.ledger().net_allocation(&maker(), market), dec!(10));
    }

    #[test]
    fn limit_breach_is_rejected_before_settlement() {
        let mut f = fixture();
        let market = amm_market(&mut f.exchange, MarketParams::perpetual(2));
        f.exchange.deposit(&maker(), dec!(100)).unwrap();
        f.exchange.deposit(&alice(), dec!(100)).unwrap();

        let err = f
            .exchange
            .buy(&alice(), market, OutcomeId::new(0), Side::Back, dec!(10), Some(dec!(4)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ledger(LedgerError::SlippageExceeded { .. })
        ));
        assert!(f.exchange.ledger().exposure(&alice(), market).is_none());
    }

    #[test]
    fn trade_needs_maker_and_engine() {
        let mut f = fixture();
        let no_maker = f.exchange.create_market(MarketParams::perpetual(2)).unwrap();
        let err = f
            .exchange
            .buy(&alice(), no_maker, OutcomeId::new(0), Side::Back, dec!(1), None)
            .unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::NoDesignatedMaker { .. })));

        let no_engine = f
            .exchange
            .create_market(MarketParams::perpetual(2).with_maker(maker()))
            .unwrap();
        let err = f
            .exchange
            .sell(&alice(), no_engine, OutcomeId::new(0), Side::Back, dec!(1), None)
            .unwrap_err();
        assert!(matches!(err, Error::Pricing(PricingError::MissingEngine { .. })));
    }

    #[test]
    fn touch_resolves_and_claims() {
        let mut f = fixture();
        f.oracle.register("feed");
        let market = amm_market(&mut f.exchange, MarketParams::resolving(2, "feed"));
        f.exchange.deposit(&maker(), dec!(100)).unwrap();
        f.exchange.deposit(&alice(), dec!(100)).unwrap();
        f.exchange
            .buy(&alice(), market, OutcomeId::new(0), Side::Back, dec!(10), None)
            .unwrap();

        assert_eq!(f.exchange.touch(&alice()), dec!(0));
        f.oracle.publish("feed", OutcomeId::new(0));
        assert_eq!(f.exchange.touch(&alice()), dec!(10));
        assert_eq!(f.exchange.ledger().free_collateral(&alice()), dec!(105));
        assert!(f.exchange.ledger().market(market).unwrap().is_resolved());
    }

    #[test]
    fn withdraw_uses_hard_claim_path() {
        let mut f = fixture();
        f.oracle.register("feed");
        let market = amm_market(&mut f.exchange, MarketParams::resolving(2, "feed"));
        f.exchange.deposit(&maker(), dec!(100)).unwrap();
        f.exchange.deposit(&alice(), dec!(5)).unwrap();
        f.exchange
            .buy(&alice(), market, OutcomeId::new(0), Side::Back, dec!(10), None)
            .unwrap();
        assert_eq!(f.exchange.ledger().free_collateral(&alice()), dec!(0));

        f.oracle.publish("feed", OutcomeId::new(0));
        f.exchange.withdraw(&alice(), dec!(10)).unwrap();
        assert_eq!(f.exchange.ledger().free_collateral(&alice()), dec!(0));
        assert_eq!(f.custody.principal(), dec!(95));
        assert!(f.exchange.ledger().balance_sheet().is_balanced());
    }

    #[test]
    fn resolve_rejects_outcome_the_market_lacks() {
        let mut f = fixture();
        f.oracle.register("feed");
        let market = f.exchange.create_market(MarketParams::resolving(2, "feed")).unwrap();
        assert_eq!(f.exchange.resolve(market).unwrap(), None);
        f.oracle.publish("feed", OutcomeId::new(5));
        assert!(matches!(
            f.exchange.resolve(market),
            Err(Error::Oracle(crate::error::OracleError::InvalidOutcome { .. }))
        ));
    }
}
