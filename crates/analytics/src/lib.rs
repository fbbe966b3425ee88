//! Depth-bounded market analytics.
//!
//! The aggregator is pushed a read-only view of an order book once per
//! analytics interval and accumulates a history of depth-bounded book
//! states. From that history it derives order-flow imbalance and a relative
//! strength index over the mid-price series, and produces the copy-on-read
//! [`MarketSnapshot`] handed to agents on market-data requests.

use book::OrderBook;
use serde::{Deserialize, Serialize};
use types::{BookLevel, MarketSnapshot, Price, Quantity, SimTime, Symbol};

// =============================================================================
// Book State
// =============================================================================

/// One recorded observation of the book, bounded to the analytics depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookState {
    /// Simulated time of the observation.
    pub timestamp: SimTime,
    /// Bid levels, best first.
    pub buy_side: Vec<BookLevel>,
    /// Ask levels, best first.
    pub sell_side: Vec<BookLevel>,
    /// Mid price at observation time, if both sides were present.
    pub mid_price: Option<Price>,
}

impl BookState {
    /// Total visible buy-side volume in this observation.
    pub fn volume_buy(&self) -> Quantity {
        self.buy_side.iter().map(|l| l.quantity).sum()
    }

    /// Total visible sell-side volume in this observation.
    pub fn volume_sell(&self) -> Quantity {
        self.sell_side.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Market Analytics
// =============================================================================

/// Per-symbol analytics aggregator.
///
/// Owned by the exchange agent and updated on the kernel's analytics
/// trigger. All queries are over the recorded history; the aggregator never
/// holds a live reference into the book.
#[derive(Debug, Clone)]
pub struct MarketAnalytics {
    symbol: Symbol,
    depth: usize,
    states: Vec<BookState>,
    /// Mid prices in observation order, only for observations where a mid
    /// existed.
    mid_prices: Vec<f64>,
    last_price: Option<Price>,
}

/// Default look-back window (in observations) for derived measures.
const DEFAULT_WINDOW: usize = 14;

impl MarketAnalytics {
    /// Create an aggregator for `symbol`, recording up to `depth` levels per
    /// side.
    pub fn new(symbol: impl Into<Symbol>, depth: usize) -> Self {
        Self {
            symbol: symbol.into(),
            depth,
            states: Vec::new(),
            mid_prices: Vec::new(),
            last_price: None,
        }
    }

    /// The symbol this aggregator observes.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of observations recorded so far.
    pub fn observations(&self) -> usize {
        self.states.len()
    }

    /// Record the book's current state.
    pub fn update(&mut self, timestamp: SimTime, order_book: &OrderBook) {
        let state = BookState {
            timestamp,
            buy_side: order_book.get_buy_side(self.depth),
            sell_side: order_book.get_sell_side(self.depth),
            mid_price: order_book.mid_price(),
        };
        if let Some(mid) = state.mid_price {
            self.mid_prices.push(mid.to_float());
        }
        self.last_price = order_book.last_price();
        self.states.push(state);
    }

    /// Buy/sell volume imbalance over the last `window` observations.
    ///
    /// Ranges over [-1, 1]: positive when the visible book is buy-heavy,
    /// negative when sell-heavy, 0 when empty.
    pub fn order_strength(&self, window: usize) -> f64 {
        let start = self.states.len().saturating_sub(window);
        let (buys, sells) = self.states[start..].iter().fold((0u64, 0u64), |(b, s), st| {
            (b + st.volume_buy().raw(), s + st.volume_sell().raw())
        });
        let total = buys + sells;
        if total == 0 {
            return 0.0;
        }
        (buys as f64 - sells as f64) / total as f64
    }

    /// Relative strength index over the last `window` mid-price changes.
    ///
    /// Simple-average form: RSI = 100 - 100 / (1 + avg_gain / avg_loss).
    /// Returns `None` until `window + 1` mid prices have been observed.
    pub fn relative_strength_index(&self, window: usize) -> Option<f64> {
        if window == 0 || self.mid_prices.len() < window + 1 {
            return None;
        }
        let tail = &self.mid_prices[self.mid_prices.len() - (window + 1)..];
        let (gains, losses) = tail.windows(2).fold((0.0, 0.0), |(g, l), w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });
        let average_gain = gains / window as f64;
        let average_loss = losses / window as f64;
        if average_loss == 0.0 {
            return Some(100.0);
        }
        let rs = average_gain / average_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    /// Build an immutable point-in-time snapshot from the latest
    /// observation.
    ///
    /// The snapshot copies all fields out; it shares no state with the
    /// aggregator or the book, so later updates cannot alter it.
    pub fn snapshot(&self) -> MarketSnapshot {
        let latest = self.states.last();
        MarketSnapshot {
            symbol: self.symbol.clone(),
            timestamp: latest.map(|s| s.timestamp).unwrap_or_default(),
            buy_side: latest.map(|s| s.buy_side.clone()).unwrap_or_default(),
            sell_side: latest.map(|s| s.sell_side.clone()).unwrap_or_default(),
            mid_price: latest.and_then(|s| s.mid_price),
            last_price: self.last_price,
            order_strength: self.order_strength(DEFAULT_WINDOW),
            rsi: self.relative_strength_index(DEFAULT_WINDOW),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AgentId, Order, OrderId, Side};

    fn book_with(bids: &[(f64, u64)], asks: &[(f64, u64)]) -> OrderBook {
        let mut book = OrderBook::new("TEST");
        let mut next_id = 1u64;
        for &(price, qty) in bids {
            let mut o = Order::limit(
                AgentId(1),
                "TEST",
                Side::Buy,
                Price::from_float(price),
                Quantity(qty),
            );
            o.id = OrderId(next_id);
            next_id += 1;
            book.send_order(o).unwrap();
        }
        for &(price, qty) in asks {
            let mut o = Order::limit(
                AgentId(2),
                "TEST",
                Side::Sell,
                Price::from_float(price),
                Quantity(qty),
            );
            o.id = OrderId(next_id);
            next_id += 1;
            book.send_order(o).unwrap();
        }
        book
    }

    #[test]
    fn test_update_records_depth_bounded_state() {
        let book = book_with(&[(99.0, 10), (98.0, 20), (97.0, 30)], &[(101.0, 5)]);
        let mut analytics = MarketAnalytics::new("TEST", 2);

        analytics.update(1000, &book);

        assert_eq!(analytics.observations(), 1);
        let snap = analytics.snapshot();
        assert_eq!(snap.timestamp, 1000);
        // Depth bound of 2: the 97.0 level is not recorded.
        assert_eq!(snap.buy_side.len(), 2);
        assert_eq!(snap.buy_side[0].price, Price::from_float(99.0));
        assert_eq!(snap.sell_side.len(), 1);
        assert_eq!(snap.mid_price, Some(Price::from_float(100.0)));
    }

    #[test]
    fn test_order_strength_sign() {
        let buy_heavy = book_with(&[(99.0, 100)], &[(101.0, 10)]);
        let mut analytics = MarketAnalytics::new("TEST", 5);
        analytics.update(0, &buy_heavy);
        assert!(analytics.order_strength(10) > 0.0);

        let sell_heavy = book_with(&[(99.0, 10)], &[(101.0, 100)]);
        let mut analytics = MarketAnalytics::new("TEST", 5);
        analytics.update(0, &sell_heavy);
        assert!(analytics.order_strength(10) < 0.0);
    }

    #[test]
    fn test_order_strength_empty_history() {
        let analytics = MarketAnalytics::new("TEST", 5);
        assert_eq!(analytics.order_strength(10), 0.0);
    }

    #[test]
    fn test_rsi_needs_enough_observations() {
        let mut analytics = MarketAnalytics::new("TEST", 5);
        let book = book_with(&[(99.0, 10)], &[(101.0, 10)]);
        for t in 0..5 {
            analytics.update(t, &book);
        }
        // Only 5 mids recorded, window of 14 needs 15.
        assert_eq!(analytics.relative_strength_index(14), None);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let mut analytics = MarketAnalytics::new("TEST", 5);
        for i in 0..6u64 {
            let px = 100.0 + i as f64;
            let book = book_with(&[(px - 1.0, 10)], &[(px + 1.0, 10)]);
            analytics.update(i, &book);
        }
        assert_eq!(analytics.relative_strength_index(5), Some(100.0));
    }

    #[test]
    fn test_snapshot_is_detached_from_later_updates() {
        let book = book_with(&[(99.0, 10)], &[(101.0, 10)]);
        let mut analytics = MarketAnalytics::new("TEST", 5);
        analytics.update(0, &book);

        let before = analytics.snapshot();

        let moved = book_with(&[(95.0, 10)], &[(97.0, 10)]);
        analytics.update(1, &moved);
        let after = analytics.snapshot();

        // The earlier snapshot still shows the state at its query time.
        assert_eq!(before.mid_price, Some(Price::from_float(100.0)));
        assert_eq!(after.mid_price, Some(Price::from_float(96.0)));
    }
}
