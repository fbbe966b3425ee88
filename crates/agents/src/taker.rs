//! Imbalance taker: consumes liquidity from the heavier side of the book.
//!
//! Uses the order-strength measure from market-data snapshots. When the
//! visible book is buy-heavy past a threshold it buys with a market order
//! (and sells when sell-heavy), following the pressure rather than quoting
//! against it.

use kernel::{Agent, KernelCtx, Trigger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use types::{AgentId, Cash, MarketSnapshot, Message, Quantity, Side, SimTime};

use crate::state::TraderState;

/// Configuration for an [`ImbalanceTaker`].
#[derive(Debug, Clone)]
pub struct ImbalanceTakerConfig {
    /// Symbol to trade.
    pub symbol: String,
    /// Probability of acting on each wake-up (0.0 to 1.0).
    pub order_probability: f64,
    /// Order-strength magnitude required before taking (0.0 to 1.0).
    pub imbalance_threshold: f64,
    /// Minimum order size.
    pub min_quantity: u64,
    /// Maximum order size.
    pub max_quantity: u64,
    /// Starting cash balance.
    pub initial_cash: Cash,
}

impl Default for ImbalanceTakerConfig {
    fn default() -> Self {
        Self {
            symbol: "ACME".to_string(),
            order_probability: 0.5,
            imbalance_threshold: 1.0 / 3.0,
            min_quantity: 1,
            max_quantity: 20,
            initial_cash: Cash::from_float(100_000.0),
        }
    }
}

/// A momentum-style taker keyed off book imbalance.
pub struct ImbalanceTaker {
    id: AgentId,
    config: ImbalanceTakerConfig,
    state: TraderState,
    rng: StdRng,
    last_view: Option<MarketSnapshot>,
}

impl ImbalanceTaker {
    /// Create an imbalance taker with a specific seed.
    pub fn with_seed(id: AgentId, config: ImbalanceTakerConfig, seed: u64) -> Self {
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

    /// Side to take, if the book is lopsided enough.
    fn signal(&self) -> Option<Side> {
        let strength = self.last_view.as_ref()?.order_strength;
        if strength > self.config.imbalance_threshold {
            Some(Side::Buy)
        } else if strength < -self.config.imbalance_threshold {
            Some(Side::Sell)
        } else {
            None
        }
    }

    fn maybe_take(&mut self, ctx: &mut KernelCtx<'_>) {
        if !self.rng.random_bool(self.config.order_probability) {
            return;
        }
        let Some(side) = self.signal() else {
            return;
        };
        let quantity = Quantity(
            self.rng
                .random_range(self.config.min_quantity..=self.config.max_quantity),
        );
        self.state
            .place_market_order(ctx, self.id, &self.config.symbol, quantity, side);
    }
}

impl Agent for ImbalanceTaker {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "imbalance-taker"
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
            Trigger::WakeUp => self.maybe_take(ctx),
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
            "imbalance taker finished"
        );
    }
}
