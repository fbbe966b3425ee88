//! Error types for order book operations.

use std::fmt;
use types::OrderId;

/// Result type for order book operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Errors that can occur while operating on an order book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// The requested order was not found (already filled, cancelled, or
    /// never resident).
    OrderNotFound(OrderId),
    /// Invalid order: zero quantity.
    ZeroQuantity,
    /// Invalid order: non-positive price for a limit order.
    InvalidPrice,
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::OrderNotFound(id) => write!(f, "order not found: {}", id),
            BookError::ZeroQuantity => write!(f, "order quantity cannot be zero"),
            BookError::InvalidPrice => write!(f, "limit order price must be positive"),
        }
    }
}

impl std::error::Error for BookError {}
