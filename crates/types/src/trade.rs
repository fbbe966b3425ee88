//! Fill records emitted by the matching engine.
//!
//! Every match between a resting (maker) order and an incoming (taker)
//! order produces two `FilledOrder` legs, one per counterparty, each
//! carrying the trade price, the filled quantity, and that side's fee.

use crate::ids::{AgentId, OrderId, Symbol};
use crate::money::{Cash, Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side's view of a single execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledOrder {
    /// Agent whose order (or part of it) was filled.
    pub agent_id: AgentId,
    /// Order this fill belongs to.
    pub order_id: OrderId,
    /// Symbol traded.
    pub symbol: Symbol,
    /// Side of the filled order.
    pub side: Side,
    /// Number of shares filled in this execution.
    pub quantity: Quantity,
    /// Execution price (always the resting order's level price).
    pub price: Price,
    /// Signed fee: positive for a maker rebate, negative for a taker fee.
    pub fee: Cash,
}

impl FilledOrder {
    /// Notional value of this fill.
    #[inline]
    pub fn value(&self) -> Cash {
        self.price * self.quantity
    }
}

impl fmt::Display for FilledOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {} ({})",
            self.side, self.quantity, self.symbol, self.price, self.order_id
        )
    }
}

/// Flat per-leg fee schedule applied by an order book.
///
/// Fees are attached verbatim to each fill leg: the maker value to the
/// resting order's leg, the taker value to the incoming order's leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fee credited to the resting side (rebates are positive).
    pub maker: Cash,
    /// Fee credited to the aggressing side (fees are negative).
    pub taker: Cash,
}

impl FeeSchedule {
    /// No fees on either side.
    pub const FREE: FeeSchedule = FeeSchedule {
        maker: Cash::ZERO,
        taker: Cash::ZERO,
    };

    /// Create a schedule from a maker rebate and a taker fee.
    pub fn new(maker: Cash, taker: Cash) -> Self {
        Self { maker, taker }
    }
}
