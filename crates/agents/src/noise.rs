//! Noise trader: generates random resting liquidity.
//!
//! On each wake-up it may place a limit order at a random price near the
//! observed mid, providing liquidity and price discovery. The reference
//! price falls back from the latest snapshot's mid, to its last trade
//! price, to a configured initial price when the market is empty.

use kernel::{Agent, KernelCtx, Trigger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use types::{AgentId, Cash, MarketSnapshot, Message, Price, Quantity, Side, SimTime};

use crate::state::TraderState;

/// Configuration for a [`NoiseTrader`].
#[derive(Debug, Clone)]
pub struct NoiseTraderConfig {
    /// Symbol to trade.
    pub symbol: String,
    /// Probability of placing an order on each wake-up (0.0 to 1.0).
    pub order_probability: f64,
    /// Maximum price deviation from the reference as a fraction
    /// (e.g., 0.02 = 2%).
    pub price_deviation: f64,
    /// Minimum order size.
    pub min_quantity: u64,
    /// Maximum order size.
    pub max_quantity: u64,
    /// Reference price when the market is empty.
    pub initial_price: Price,
    /// Starting cash balance.
    pub initial_cash: Cash,
}

impl Default for NoiseTraderConfig {
    fn default() -> Self {
        Self {
            symbol: "ACME".to_string(),
            order_probability: 0.5,
            price_deviation: 0.02,
            min_quantity: 1,
            max_quantity: 50,
            initial_price: Price::from_float(100.0),
            initial_cash: Cash::from_float(100_000.0),
        }
    }
}

/// A random trader that quotes limit orders around the mid price.
pub struct NoiseTrader {
    id: AgentId,
    config: NoiseTraderConfig,
    state: TraderState,
    rng: StdRng,
    last_view: Option<MarketSnapshot>,
}

impl NoiseTrader {
    /// Create a noise trader with a specific seed, for reproducible runs.
    pub fn with_seed(id: AgentId, config: NoiseTraderConfig, seed: u64) -> Self {
        let initial_cash = config.initial_cash;
        Self {
            id,
            config,
            state: TraderState::new(initial_cash),
            rng: StdRng::seed_from_u64(seed),
            last_view: None,
        }
    }

    /// Current cash balance.
    pub fn cash(&self) -> Cash {
        self.state.cash()
    }

    /// Current position in the configured symbol.
    pub fn position(&self) -> i64 {
        self.state.position_for(&self.config.symbol)
    }

    /// Reference price: snapshot mid, else last trade, else initial price.
    fn reference_price(&self) -> Price {
        self.last_view
            .as_ref()
            .and_then(|view| view.mid_price.or(view.last_price))
            .unwrap_or(self.config.initial_price)
    }

    fn maybe_quote(&mut self, ctx: &mut KernelCtx<'_>) {
        if !self.rng.random_bool(self.config.order_probability) {
            return;
        }
        let side = if self.rng.random_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let deviation = self
            .rng
            .random_range(-self.config.price_deviation..self.config.price_deviation);
        let reference = self.reference_price().to_float();
        let price = Price::from_float((reference * (1.0 + deviation)).max(0.01));
        let quantity = Quantity(
            self.rng
                .random_range(self.config.min_quantity..=self.config.max_quantity),
        );

        self.state.place_limit_order(
            ctx,
            self.id,
            &self.config.symbol,
            quantity,
            side,
            price,
        );
    }
}

impl Agent for NoiseTrader {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "noise-trader"
    }

    fn on_message(&mut self, _ctx: &mut KernelCtx<'_>, message: Message) {
        match message {
            Message::MarketData(snapshot) if snapshot.symbol == self.config.symbol => {
                self.last_view = Some(snapshot);
            }
            other => self.state.apply(&other),
        }
    }

    fn on_trigger(&mut self, ctx: &mut KernelCtx<'_>, trigger: Trigger) {
        match trigger {
            Trigger::MarketDataPoll => {
                if let Some(exchange) = ctx.exchange_id() {
                    ctx.send_message(
                        self.id,
                        exchange,
                        Message::RequestMarketData { requester: self.id },
                        0,
                    );
                }
            }
            Trigger::WakeUp => self.maybe_quote(ctx),
            Trigger::AnalyticsRefresh => {}
        }
    }

    fn on_stop(&mut self, final_time: SimTime) {
        info!(
            agent = %self.id,
            time = final_time,
            cash = %self.state.cash(),
            position = self.position(),
            orders = self.state.orders_placed(),
            fills = self.state.fills_received(),
            "noise trader finished"
        );
    }
}
