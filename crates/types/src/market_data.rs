//! Market data value types.
//!
//! Depth levels and the point-in-time market snapshot handed to agents in
//! response to a market-data request. Snapshots are plain values built by
//! copying fields out at query time, so later book mutations can never
//! retroactively alter one.

use crate::ids::{SimTime, Symbol};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};

// =============================================================================
// Depth Types
// =============================================================================

/// A single price level in a depth view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price at this level.
    pub price: Price,
    /// Total resting quantity at this price.
    pub quantity: Quantity,
    /// Number of orders queued at this level.
    pub order_count: usize,
}

// =============================================================================
// Market Snapshot
// =============================================================================

/// Immutable point-in-time view of one instrument's market state.
///
/// Sides are ordered most competitive first: bids descending by price,
/// asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MarketSnapshot {
    /// Instrument this snapshot describes.
    pub symbol: Symbol,
    /// Simulated time the snapshot was taken.
    pub timestamp: SimTime,
    /// Bid levels, best (highest) first.
    pub buy_side: Vec<BookLevel>,
    /// Ask levels, best (lowest) first.
    pub sell_side: Vec<BookLevel>,
    /// Mid price; `None` when either side is empty.
    pub mid_price: Option<Price>,
    /// Last traded price, if any trade has occurred.
    pub last_price: Option<Price>,
    /// Buy/sell volume imbalance over the analytics window, in [-1, 1].
    pub order_strength: f64,
    /// Relative strength index over the mid-price series, if computable.
    pub rsi: Option<f64>,
}

impl MarketSnapshot {
    /// Best bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.buy_side.first().map(|l| l.price)
    }

    /// Best ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.sell_side.first().map(|l| l.price)
    }

    /// Total visible volume on the buy side.
    pub fn volume_buy(&self) -> Quantity {
        self.buy_side.iter().map(|l| l.quantity).sum()
    }

    /// Total visible volume on the sell side.
    pub fn volume_sell(&self) -> Quantity {
        self.sell_side.iter().map(|l| l.quantity).sum()
    }
}
