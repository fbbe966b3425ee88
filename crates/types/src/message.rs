//! The in-process message contract between agents.
//!
//! A `Message` is the typed unit of communication dispatched by the kernel.
//! Variants carry their payloads directly; `MessageKind` is the closed tag
//! used for allow-list filtering at send boundaries and for logging. The
//! creation-order sequence number that breaks delivery-time ties lives on
//! the kernel's queue envelope, not here.

use crate::ids::{AgentId, OrderId, Symbol};
use crate::market_data::MarketSnapshot;
use crate::money::Quantity;
use crate::order::Order;
use crate::trade::FilledOrder;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Message Kind
// =============================================================================

/// Closed enumeration of message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    LimitOrder,
    MarketOrder,
    CancelOrder,
    ModifyOrder,
    OrderAccepted,
    OrderCancelled,
    OrderExecuted,
    RequestMarketData,
    MarketData,
    WakeUp,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::LimitOrder => "LIMIT_ORDER",
            MessageKind::MarketOrder => "MARKET_ORDER",
            MessageKind::CancelOrder => "CANCEL_ORDER",
            MessageKind::ModifyOrder => "MODIFY_ORDER",
            MessageKind::OrderAccepted => "ORDER_ACCEPTED",
            MessageKind::OrderCancelled => "ORDER_CANCELLED",
            MessageKind::OrderExecuted => "ORDER_EXECUTED",
            MessageKind::RequestMarketData => "REQUEST_MARKET_DATA",
            MessageKind::MarketData => "MARKET_DATA",
            MessageKind::WakeUp => "WAKE_UP",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Message
// =============================================================================

/// A typed message with its payload.
///
/// Recipients match on the variants they understand; an unhandled variant is
/// ignored by convention, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Submit a limit order to an exchange.
    LimitOrder(Order),
    /// Submit a market order to an exchange.
    MarketOrder(Order),
    /// Request cancellation of a resting order.
    CancelOrder { symbol: Symbol, order_id: OrderId },
    /// Request modification of a resting order (reserved; currently
    /// unhandled by the exchange).
    ModifyOrder {
        symbol: Symbol,
        order_id: OrderId,
        quantity: Quantity,
    },
    /// A limit order (or its remainder) is now resting on the book.
    OrderAccepted(OrderId),
    /// A resting order was cancelled.
    OrderCancelled(OrderId),
    /// Part or all of an order executed.
    OrderExecuted(FilledOrder),
    /// Ask an exchange for a market-data snapshot, delivered back to
    /// `requester`.
    RequestMarketData { requester: AgentId },
    /// A point-in-time market snapshot.
    MarketData(MarketSnapshot),
    /// Scheduled wake-up with no payload.
    WakeUp,
}

impl Message {
    /// The closed type tag for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::LimitOrder(_) => MessageKind::LimitOrder,
            Message::MarketOrder(_) => MessageKind::MarketOrder,
            Message::CancelOrder { .. } => MessageKind::CancelOrder,
            Message::ModifyOrder { .. } => MessageKind::ModifyOrder,
            Message::OrderAccepted(_) => MessageKind::OrderAccepted,
            Message::OrderCancelled(_) => MessageKind::OrderCancelled,
            Message::OrderExecuted(_) => MessageKind::OrderExecuted,
            Message::RequestMarketData { .. } => MessageKind::RequestMarketData,
            Message::MarketData(_) => MessageKind::MarketData,
            Message::WakeUp => MessageKind::WakeUp,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}
