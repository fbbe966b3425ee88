//! Common trading-agent accounting state.
//!
//! Agents embed [`TraderState`] rather than duplicating cash/position
//! bookkeeping. It applies execution and cancellation notifications using
//! the fee-sign convention (fee is credited first, then notional is debited
//! for a buy fill or credited for a sell fill) and provides the placement
//! helpers that construct an order, record it, reserve a pending position
//! delta, and send it to the exchange through the kernel.

use std::collections::HashMap;

use kernel::KernelCtx;
use tracing::warn;
use types::{
    AgentId, Cash, FilledOrder, Message, Order, OrderId, Price, Quantity, Side, Symbol,
};

/// Position, cash, and open-order tracking shared by trading agents.
#[derive(Debug, Clone)]
pub struct TraderState {
    starting_cash: Cash,
    cash: Cash,
    /// Settled positions per symbol (positive = long).
    positions: HashMap<Symbol, i64>,
    /// Signed position deltas reserved by in-flight orders.
    pending: HashMap<Symbol, i64>,
    /// Orders placed and not yet fully filled or cancelled.
    open_orders: HashMap<OrderId, Order>,
    orders_placed: u64,
    fills_received: u64,
}

impl TraderState {
    /// Create a fresh state with the given starting cash.
    pub fn new(starting_cash: Cash) -> Self {
        Self {
            starting_cash,
            cash: starting_cash,
            positions: HashMap::new(),
            pending: HashMap::new(),
            open_orders: HashMap::new(),
            orders_placed: 0,
            fills_received: 0,
        }
    }

    /// Current cash balance.
    pub fn cash(&self) -> Cash {
        self.cash
    }

    /// Cash the agent started with.
    pub fn starting_cash(&self) -> Cash {
        self.starting_cash
    }

    /// Settled position for a symbol.
    pub fn position_for(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    /// Pending (reserved) position delta for a symbol.
    pub fn pending_for(&self, symbol: &str) -> i64 {
        self.pending.get(symbol).copied().unwrap_or(0)
    }

    /// Orders placed and not yet resolved.
    pub fn open_orders(&self) -> &HashMap<OrderId, Order> {
        &self.open_orders
    }

    /// Total orders placed.
    pub fn orders_placed(&self) -> u64 {
        self.orders_placed
    }

    /// Total fills received.
    pub fn fills_received(&self) -> u64 {
        self.fills_received
    }

    // -------------------------------------------------------------------------
    // Notification handling
    // -------------------------------------------------------------------------

    /// Apply an inbound notification. Messages this state does not account
    /// for are ignored.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::OrderExecuted(fill) => self.on_execution(fill),
            Message::OrderCancelled(order_id) => self.on_cancelled(*order_id),
            _ => {}
        }
    }

    /// Update balances for one fill leg: fee first, then notional.
    fn on_execution(&mut self, fill: &FilledOrder) {
        self.cash += fill.fee;
        let quantity = fill.quantity.raw() as i64;
        let notional = fill.value();
        match fill.side {
            Side::Buy => {
                *self.positions.entry(fill.symbol.clone()).or_default() += quantity;
                self.cash -= notional;
            }
            Side::Sell => {
                *self.positions.entry(fill.symbol.clone()).or_default() -= quantity;
                self.cash += notional;
            }
        }
        *self.pending.entry(fill.symbol.clone()).or_default() -= fill.side.sign() * quantity;
        self.fills_received += 1;

        if let Some(order) = self.open_orders.get_mut(&fill.order_id) {
            order.remaining_quantity = order.remaining_quantity.saturating_sub(fill.quantity);
            if order.remaining_quantity.is_zero() {
                self.open_orders.remove(&fill.order_id);
            }
        }
    }

    /// Release the reservation for a cancelled order and forget it.
    /// Unknown ids are ignored: late cancels are expected.
    fn on_cancelled(&mut self, order_id: OrderId) {
        if let Some(order) = self.open_orders.remove(&order_id) {
            let remaining = order.remaining_quantity.raw() as i64;
            *self.pending.entry(order.symbol).or_default() -= order.side.sign() * remaining;
        }
    }

    // -------------------------------------------------------------------------
    // Order placement
    // -------------------------------------------------------------------------

    /// Construct, record, and send a limit order to the exchange.
    /// Returns the assigned order id, or `None` when no exchange is mounted.
    pub fn place_limit_order(
        &mut self,
        ctx: &mut KernelCtx<'_>,
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        quantity: Quantity,
        side: Side,
        limit_price: Price,
    ) -> Option<OrderId> {
        let order = Order::limit(agent_id, symbol, side, limit_price, quantity);
        self.submit(ctx, order, Message::LimitOrder)
    }

    /// Construct, record, and send a market order to the exchange.
    pub fn place_market_order(
        &mut self,
        ctx: &mut KernelCtx<'_>,
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        quantity: Quantity,
        side: Side,
    ) -> Option<OrderId> {
        let order = Order::market(agent_id, symbol, side, quantity);
        self.submit(ctx, order, Message::MarketOrder)
    }

    /// Request cancellation of one of this agent's orders. The local record
    /// stays until the exchange confirms with ORDER_CANCELLED.
    pub fn cancel_order(
        &mut self,
        ctx: &mut KernelCtx<'_>,
        agent_id: AgentId,
        order_id: OrderId,
    ) {
        let Some(order) = self.open_orders.get(&order_id) else {
            return;
        };
        let Some(exchange) = ctx.exchange_id() else {
            warn!(%agent_id, "no exchange mounted, cancel not sent");
            return;
        };
        let message = Message::CancelOrder {
            symbol: order.symbol.clone(),
            order_id,
        };
        ctx.send_message(agent_id, exchange, message, 0);
    }

    fn submit(
        &mut self,
        ctx: &mut KernelCtx<'_>,
        mut order: Order,
        wrap: fn(Order) -> Message,
    ) -> Option<OrderId> {
        let Some(exchange) = ctx.exchange_id() else {
            warn!(agent = %order.agent_id, "no exchange mounted, order not sent");
            return None;
        };
        order.id = ctx.next_order_id();
        order.placed_at = ctx.now();

        let delta = order.side.sign() * order.quantity.raw() as i64;
        *self.pending.entry(order.symbol.clone()).or_default() += delta;
        self.open_orders.insert(order.id, order.clone());
        self.orders_placed += 1;

        let id = order.id;
        let sender = order.agent_id;
        ctx.send_message(sender, exchange, wrap(order), 0);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(order_id: u64, side: Side, quantity: u64, price: f64, fee: f64) -> FilledOrder {
        FilledOrder {
            agent_id: AgentId(1),
            order_id: OrderId(order_id),
            symbol: "ACME".into(),
            side,
            quantity: Quantity(quantity),
            price: Price::from_float(price),
            fee: Cash::from_float(fee),
        }
    }

    #[test]
    fn test_buy_fill_fee_then_notional() {
        let mut state = TraderState::new(Cash::from_float(1_000.0));
        state.apply(&Message::OrderExecuted(fill(1, Side::Buy, 5, 100.0, -0.25)));

        // Fee credited first (negative taker fee), then notional debited.
        assert_eq!(state.cash(), Cash::from_float(1_000.0 - 0.25 - 500.0));
        assert_eq!(state.position_for("ACME"), 5);
        assert_eq!(state.pending_for("ACME"), -5);
        assert_eq!(state.fills_received(), 1);
    }

    #[test]
    fn test_sell_fill_credits_notional() {
        let mut state = TraderState::new(Cash::from_float(1_000.0));
        state.apply(&Message::OrderExecuted(fill(1, Side::Sell, 3, 50.0, 0.10)));

        assert_eq!(state.cash(), Cash::from_float(1_000.0 + 0.10 + 150.0));
        assert_eq!(state.position_for("ACME"), -3);
        assert_eq!(state.pending_for("ACME"), 3);
    }

    #[test]
    fn test_cancel_releases_remaining_reservation() {
        let mut state = TraderState::new(Cash::ZERO);
        let mut order = Order::limit(
            AgentId(1),
            "ACME",
            Side::Buy,
            Price::from_float(100.0),
            Quantity(10),
        );
        order.id = OrderId(4);
        state.open_orders.insert(order.id, order);
        state.pending.insert("ACME".into(), 10);

        // Partial fill first, then cancellation of the remainder.
        state.apply(&Message::OrderExecuted(fill(4, Side::Buy, 4, 100.0, 0.0)));
        assert_eq!(state.pending_for("ACME"), 6);

        state.apply(&Message::OrderCancelled(OrderId(4)));
        assert_eq!(state.pending_for("ACME"), 0);
        assert!(state.open_orders().is_empty());
    }

    #[test]
    fn test_cancel_unknown_order_is_noop() {
        let mut state = TraderState::new(Cash::ZERO);
        state.apply(&Message::OrderCancelled(OrderId(99)));
        assert_eq!(state.pending_for("ACME"), 0);
    }

    #[test]
    fn test_full_fill_forgets_open_order() {
        let mut state = TraderState::new(Cash::from_float(10_000.0));
        let mut order = Order::limit(
            AgentId(1),
            "ACME",
            Side::Buy,
            Price::from_float(100.0),
            Quantity(5),
        );
        order.id = OrderId(2);
        state.open_orders.insert(order.id, order);
        state.pending.insert("ACME".into(), 5);

        state.apply(&Message::OrderExecuted(fill(2, Side::Buy, 5, 100.0, 0.0)));

        assert!(state.open_orders().is_empty());
        assert_eq!(state.pending_for("ACME"), 0);
        assert_eq!(state.position_for("ACME"), 5);
    }
}
