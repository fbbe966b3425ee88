//! Limit order book with price-time priority matching.
//!
//! The book maintains buy (bid) and sell (ask) price levels in `BTreeMap`s,
//! so the best price on either side is an ordered-map endpoint and empty
//! levels are removed eagerly. Within a level, orders queue in FIFO order
//! (time priority).
//!
//! Matching runs inside [`OrderBook::send_order`]: market orders walk the
//! opposing side from the best price outward until filled or liquidity runs
//! out; marketable limit orders do the same but re-check the crossing
//! condition against their limit after every level drains, and any remainder
//! rests at its limit price. Every match emits two fill legs, one for the
//! resting (maker) order and one for the incoming (taker) order, both priced
//! at the resting order's level.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, trace};
use types::{
    AgentId, BookLevel, FeeSchedule, FilledOrder, Order, OrderId, OrderType, Price, Quantity, Side,
};

use crate::error::{BookError, Result};

// =============================================================================
// Price Level
// =============================================================================

/// A price level containing orders at a single price point.
///
/// `total_quantity` caches the sum of the queued orders' remaining
/// quantities and is kept in lockstep by every mutation.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Total quantity resting at this price.
    pub total_quantity: Quantity,
    /// Orders at this price, in time priority order (FIFO).
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    /// Add an order to the back of the queue.
    pub fn push(&mut self, order: Order) {
        self.total_quantity += order.remaining_quantity;
        self.orders.push_back(order);
    }

    /// Peek at the first order without removing it.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Check if this price level is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of orders at this price level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

// =============================================================================
// Match Report
// =============================================================================

/// Outcome of submitting one order to the book.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// Fill legs produced by matching, in execution order. Each match
    /// contributes a maker leg followed by a taker leg.
    pub fills: Vec<FilledOrder>,
    /// Id of the order if a remainder was placed on the book.
    pub resting: Option<OrderId>,
    /// Market-order remainder that found no liquidity and was discarded.
    pub discarded: Quantity,
}

impl MatchReport {
    /// Check if any executions occurred.
    pub fn has_fills(&self) -> bool {
        !self.fills.is_empty()
    }

    /// Total quantity traded (counting each match once, not per leg).
    pub fn traded_quantity(&self) -> Quantity {
        // Legs come in maker/taker pairs over the same quantity.
        Quantity(self.fills.iter().map(|f| f.quantity.raw()).sum::<u64>() / 2)
    }
}

// =============================================================================
// Order Book
// =============================================================================

/// Order book for a single symbol.
///
/// Uses `BTreeMap` to maintain price levels in sorted order:
/// - Bids: highest price first (iterating in reverse)
/// - Asks: lowest price first (iterating forward)
///
/// A price appears in a side's map iff its level is non-empty; levels are
/// excised the moment their cached volume reaches zero.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// The symbol this order book is for.
    symbol: String,
    /// Buy orders indexed by price.
    bids: BTreeMap<Price, PriceLevel>,
    /// Sell orders indexed by price.
    asks: BTreeMap<Price, PriceLevel>,
    /// Quick lookup of resting orders by id, for cancellation.
    order_index: HashMap<OrderId, (Side, Price)>,
    /// Last traded price.
    last_price: Option<Price>,
    /// Maker/taker fees attached to fill legs.
    fees: FeeSchedule,
}

impl OrderBook {
    /// Create a new empty order book for a symbol, with no fees.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            last_price: None,
            fees: FeeSchedule::FREE,
        }
    }

    /// Set the fee schedule.
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    /// Get the symbol this book is for.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    // -------------------------------------------------------------------------
    // Order entry
    // -------------------------------------------------------------------------

    /// Submit an order to the book, matching it against resting liquidity.
    ///
    /// Limit orders match while marketable and rest any remainder at their
    /// limit price. Market orders match until filled or the opposing side is
    /// exhausted; an unfilled market-order remainder is discarded, never
    /// queued.
    pub fn send_order(&mut self, mut order: Order) -> Result<MatchReport> {
        if order.remaining_quantity.is_zero() {
            return Err(BookError::ZeroQuantity);
        }

        let mut report = MatchReport::default();
        match order.order_type {
            OrderType::Limit { price } => {
                if !price.is_positive() {
                    return Err(BookError::InvalidPrice);
                }
                self.execute(&mut order, Some(price), &mut report.fills);
                if !order.remaining_quantity.is_zero() {
                    report.resting = Some(order.id);
                    self.rest_order(order);
                }
            }
            OrderType::Market => {
                self.execute(&mut order, None, &mut report.fills);
                report.discarded = order.remaining_quantity;
                if !report.discarded.is_zero() {
                    debug!(
                        order = %order.id,
                        remaining = %report.discarded,
                        "market order remainder discarded, opposing side exhausted"
                    );
                }
            }
        }
        Ok(report)
    }

    /// Match `taker` against the opposing side, best price first.
    ///
    /// The crossing condition is re-evaluated after each level drains, since
    /// fees and the trade price are resolved per level, not per order.
    fn execute(&mut self, taker: &mut Order, limit: Option<Price>, fills: &mut Vec<FilledOrder>) {
        while !taker.remaining_quantity.is_zero() {
            let Some(best) = (match taker.side {
                Side::Buy => self.best_ask_price(),
                Side::Sell => self.best_bid_price(),
            }) else {
                break;
            };

            if let Some(limit) = limit {
                let marketable = match taker.side {
                    Side::Buy => best <= limit,
                    Side::Sell => best >= limit,
                };
                if !marketable {
                    break;
                }
            }

            self.trade_level(taker, best, fills);
        }
    }

    /// Trade `taker` against the FIFO queue at one opposing price level.
    ///
    /// Fills head-of-queue first, emitting a maker and a taker leg per
    /// match, and stops when the taker is satisfied or the level empties.
    fn trade_level(&mut self, taker: &mut Order, price: Price, fills: &mut Vec<FilledOrder>) {
        let resting_side = taker.side.opposite();

        while !taker.remaining_quantity.is_zero() {
            let Some((maker_agent, maker_order, maker_remaining)) =
                self.peek_front(resting_side, price)
            else {
                break;
            };

            let quantity = taker.remaining_quantity.min(maker_remaining);
            trace!(
                symbol = %self.symbol,
                price = %price,
                quantity = %quantity,
                maker = %maker_order,
                taker = %taker.id,
                "match"
            );

            fills.push(FilledOrder {
                agent_id: maker_agent,
                order_id: maker_order,
                symbol: self.symbol.clone(),
                side: resting_side,
                quantity,
                price,
                fee: self.fees.maker,
            });
            fills.push(FilledOrder {
                agent_id: taker.agent_id,
                order_id: taker.id,
                symbol: self.symbol.clone(),
                side: taker.side,
                quantity,
                price,
                fee: self.fees.taker,
            });

            taker.remaining_quantity -= quantity;
            self.last_price = Some(price);

            if self.fill_front(resting_side, price, quantity) {
                // Level emptied and was removed.
                break;
            }
        }
    }

    /// Peek at the head of the queue at `price` on `side`.
    /// Returns (agent_id, order_id, remaining_quantity).
    fn peek_front(&self, side: Side, price: Price) -> Option<(AgentId, OrderId, Quantity)> {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels
            .get(&price)
            .and_then(|level| level.front())
            .map(|order| (order.agent_id, order.id, order.remaining_quantity))
    }

    /// Reduce the head order at `price` on `side` by `quantity`.
    ///
    /// Pops the head if fully consumed, keeps the cached level volume in
    /// sync, and excises the level when it empties. Returns `true` when the
    /// level was removed.
    fn fill_front(&mut self, side: Side, price: Price, quantity: Quantity) -> bool {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Some(level) = levels.get_mut(&price) else {
            return true;
        };

        let mut consumed = None;
        if let Some(front) = level.orders.front_mut() {
            front.remaining_quantity = front.remaining_quantity.saturating_sub(quantity);
            if front.remaining_quantity.is_zero() {
                consumed = Some(front.id);
            }
        }
        level.total_quantity = level.total_quantity.saturating_sub(quantity);
        if consumed.is_some() {
            level.orders.pop_front();
        }

        let emptied = level.is_empty();
        if emptied {
            levels.remove(&price);
        }
        if let Some(id) = consumed {
            self.order_index.remove(&id);
        }
        emptied
    }

    /// Place an order with remaining quantity on the book at its limit
    /// price, at the tail of that level's queue.
    fn rest_order(&mut self, order: Order) {
        let price = match order.order_type {
            OrderType::Limit { price } => price,
            // send_order never rests market orders.
            OrderType::Market => return,
        };
        self.order_index.insert(order.id, (order.side, price));
        let levels = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        levels.entry(price).or_default().push(order);
    }

    // -------------------------------------------------------------------------
    // Cancellation
    // -------------------------------------------------------------------------

    /// Remove a resting order from the book by id, returning it.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<Order> {
        let (side, price) = self
            .order_index
            .remove(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        if let Some(level) = levels.get_mut(&price)
            && let Some(pos) = level.orders.iter().position(|o| o.id == order_id)
        {
            let order = level.orders.remove(pos).expect("position was just found");
            level.total_quantity = level
                .total_quantity
                .saturating_sub(order.remaining_quantity);
            if level.is_empty() {
                levels.remove(&price);
            }
            debug!(symbol = %self.symbol, order = %order_id, "order cancelled");
            return Ok(order);
        }

        Err(BookError::OrderNotFound(order_id))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Get the best bid (highest buy price) and its level.
    pub fn best_bid(&self) -> Option<(Price, &PriceLevel)> {
        self.bids.iter().next_back().map(|(p, l)| (*p, l))
    }

    /// Get the best ask (lowest sell price) and its level.
    pub fn best_ask(&self) -> Option<(Price, &PriceLevel)> {
        self.asks.iter().next().map(|(p, l)| (*p, l))
    }

    /// Get the best bid price.
    pub fn best_bid_price(&self) -> Option<Price> {
        self.best_bid().map(|(p, _)| p)
    }

    /// Get the best ask price.
    pub fn best_ask_price(&self) -> Option<Price> {
        self.best_ask().map(|(p, _)| p)
    }

    /// Spread between best bid and ask; `None` if either side is empty.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Mid price; `None` if either side is empty.
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(Price((bid.raw() + ask.raw()) / 2)),
            _ => None,
        }
    }

    /// Last traded price, if any trade has occurred.
    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    /// Depth view of the buy side: up to `depth` best bid levels, highest
    /// price first.
    pub fn get_buy_side(&self, depth: usize) -> Vec<BookLevel> {
        self.bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity,
                order_count: level.order_count(),
            })
            .collect()
    }

    /// Depth view of the sell side: up to `depth` best ask levels, lowest
    /// price first.
    pub fn get_sell_side(&self, depth: usize) -> Vec<BookLevel> {
        self.asks
            .iter()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity,
                order_count: level.order_count(),
            })
            .collect()
    }

    /// Total volume of all bid orders.
    pub fn total_bid_volume(&self) -> Quantity {
        self.bids.values().map(|l| l.total_quantity).sum()
    }

    /// Total volume of all ask orders.
    pub fn total_ask_volume(&self) -> Quantity {
        self.asks.values().map(|l| l.total_quantity).sum()
    }

    /// Number of price levels on the bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of price levels on the ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Total number of resting orders in the book.
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// Check if the book has no resting orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
