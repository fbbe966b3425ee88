//! Order types for the market simulator.
//!
//! Defines order sides, the closed market/limit order variant, and the
//! `Order` record itself. Classification is a closed enum so the book can
//! match exhaustively instead of falling back to an "unknown type" error.

use crate::ids::{AgentId, OrderId, SimTime, Symbol};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Order Side
// =============================================================================

/// Which side of the market the order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed direction of a position change: +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Order Type
// =============================================================================

/// Type of order determining execution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute immediately against resting liquidity; any remainder is
    /// discarded, never queued.
    Market,
    /// Execute at the specified price or better; the remainder rests.
    Limit { price: Price },
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit { price } => write!(f, "LIMIT@{}", price),
        }
    }
}

// =============================================================================
// Order Struct
// =============================================================================

/// An order submitted by an agent.
///
/// `remaining_quantity` is non-negative and only ever decreases, via
/// matching. The id is assigned by the kernel's id source when the order is
/// placed; `OrderId(0)` is the unassigned placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier (assigned at placement, 0 = placeholder).
    pub id: OrderId,
    /// Agent who submitted the order.
    pub agent_id: AgentId,
    /// Symbol being traded.
    pub symbol: Symbol,
    /// Buy or Sell.
    pub side: Side,
    /// Market or Limit order.
    pub order_type: OrderType,
    /// Requested number of shares.
    pub quantity: Quantity,
    /// Remaining unfilled quantity.
    pub remaining_quantity: Quantity,
    /// Simulated time the order was placed.
    pub placed_at: SimTime,
}

impl Order {
    /// Create a new limit order.
    pub fn limit(
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: OrderId(0),
            agent_id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit { price },
            quantity,
            remaining_quantity: quantity,
            placed_at: 0,
        }
    }

    /// Create a new market order.
    pub fn market(
        agent_id: AgentId,
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: OrderId(0),
            agent_id,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            remaining_quantity: quantity,
            placed_at: 0,
        }
    }

    /// Get the limit price if this is a limit order.
    pub fn limit_price(&self) -> Option<Price> {
        match self.order_type {
            OrderType::Limit { price } => Some(price),
            OrderType::Market => None,
        }
    }

    /// Check if the order is fully filled.
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} ({})",
            self.id, self.side, self.quantity, self.symbol, self.order_type
        )
    }
}
