//! The exchange agent: message-driven front end to the order books.
//!
//! Owns one order book and one analytics aggregator per listed symbol.
//! Incoming order messages are forwarded to the book; the resulting fill
//! legs and acknowledgements are sent back out through a fixed allow-list
//! of outbound message types. Anything else constructed internally is
//! suppressed at the send boundary.

use std::collections::HashMap;

use analytics::MarketAnalytics;
use book::OrderBook;
use tracing::{debug, warn};
use types::{AgentId, FeeSchedule, Message, MessageKind, Order, OrderId, Symbol};

use crate::agent::{Agent, KernelCtx, Trigger};

/// Outbound message types the exchange is allowed to emit.
const OUTBOUND_ALLOWED: [MessageKind; 4] = [
    MessageKind::OrderAccepted,
    MessageKind::OrderCancelled,
    MessageKind::OrderExecuted,
    MessageKind::MarketData,
];

/// Message-driven exchange front end for a set of listed symbols.
pub struct ExchangeAgent {
    id: AgentId,
    /// Listed symbols in listing order; iteration always follows this so
    /// outbound message sequence numbers are deterministic.
    symbols: Vec<Symbol>,
    books: HashMap<Symbol, OrderBook>,
    analytics: HashMap<Symbol, MarketAnalytics>,
}

impl ExchangeAgent {
    /// Create an exchange listing the given symbols.
    ///
    /// `depth` bounds the analytics aggregators' recorded levels per side;
    /// `fees` applies to every listed book.
    pub fn new(
        id: AgentId,
        symbols: impl IntoIterator<Item = impl Into<Symbol>>,
        depth: usize,
        fees: FeeSchedule,
    ) -> Self {
        let symbols: Vec<Symbol> = symbols.into_iter().map(Into::into).collect();
        let books = symbols
            .iter()
            .map(|s| (s.clone(), OrderBook::new(s.clone()).with_fees(fees)))
            .collect();
        let analytics = symbols
            .iter()
            .map(|s| (s.clone(), MarketAnalytics::new(s.clone(), depth)))
            .collect();
        Self {
            id,
            symbols,
            books,
            analytics,
        }
    }

    /// Listed symbols, in listing order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Read-only access to a symbol's book.
    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Read-only access to a symbol's analytics.
    pub fn analytics(&self, symbol: &str) -> Option<&MarketAnalytics> {
        self.analytics.get(symbol)
    }

    /// Send through the outbound allow-list; everything else is dropped.
    fn forward(&self, ctx: &mut KernelCtx<'_>, recipient: AgentId, message: Message) {
        if OUTBOUND_ALLOWED.contains(&message.kind()) {
            ctx.send_message(self.id, recipient, message, 0);
        } else {
            debug!(kind = %message.kind(), "exchange suppressed non-allowed outbound message");
        }
    }

    /// Route an order to its book and fan the outcome back out.
    fn process_order(&mut self, ctx: &mut KernelCtx<'_>, order: Order) {
        let owner = order.agent_id;
        let Some(order_book) = self.books.get_mut(&order.symbol) else {
            warn!(symbol = %order.symbol, %order, "order for unlisted symbol ignored");
            return;
        };
        match order_book.send_order(order) {
            Ok(report) => {
                if let Some(order_id) = report.resting {
                    self.forward(ctx, owner, Message::OrderAccepted(order_id));
                }
                for fill in report.fills {
                    let recipient = fill.agent_id;
                    self.forward(ctx, recipient, Message::OrderExecuted(fill));
                }
            }
            Err(err) => warn!(%err, "order rejected by book"),
        }
    }

    /// Cancel a resting order. A cancel for an id no longer resident is a
    /// no-op: duplicate and late cancels are expected under delivery delays.
    fn process_cancel(&mut self, ctx: &mut KernelCtx<'_>, symbol: Symbol, order_id: OrderId) {
        let Some(order_book) = self.books.get_mut(&symbol) else {
            warn!(%symbol, "cancel for unlisted symbol ignored");
            return;
        };
        match order_book.cancel_order(order_id) {
            Ok(order) => {
                let owner = order.agent_id;
                self.forward(ctx, owner, Message::OrderCancelled(order_id));
            }
            Err(_) => {
                debug!(%order_id, "cancel for non-resident order ignored");
            }
        }
    }

    /// Reply to a market-data request with one snapshot per listed symbol.
    fn send_market_data(&self, ctx: &mut KernelCtx<'_>, requester: AgentId) {
        for symbol in &self.symbols {
            if let Some(analytics) = self.analytics.get(symbol) {
                self.forward(ctx, requester, Message::MarketData(analytics.snapshot()));
            }
        }
    }
}

impl Agent for ExchangeAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn name(&self) -> &str {
        "exchange"
    }

    fn on_message(&mut self, ctx: &mut KernelCtx<'_>, message: Message) {
        match message {
            Message::LimitOrder(order) | Message::MarketOrder(order) => {
                self.process_order(ctx, order);
            }
            Message::CancelOrder { symbol, order_id } => {
                self.process_cancel(ctx, symbol, order_id);
            }
            Message::RequestMarketData { requester } => {
                self.send_market_data(ctx, requester);
            }
            other => {
                debug!(kind = %other.kind(), "exchange ignoring unhandled message");
            }
        }
    }

    fn on_trigger(&mut self, ctx: &mut KernelCtx<'_>, trigger: Trigger) {
        if trigger == Trigger::AnalyticsRefresh {
            for symbol in &self.symbols {
                if let (Some(analytics), Some(order_book)) =
                    (self.analytics.get_mut(symbol), self.books.get(symbol))
                {
                    analytics.update(ctx.now(), order_book);
                }
            }
        }
    }
}
