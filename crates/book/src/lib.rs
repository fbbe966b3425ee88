//! Limit order book and matching engine.
//!
//! This crate provides the market mechanics of the simulator:
//! - Sorted price levels with FIFO queues (price-time priority)
//! - Market and limit order matching with maker/taker fee attribution
//! - Cancellation by order id
//! - Read-only depth, best-price, and mid-price queries

mod error;
mod order_book;

pub use error::{BookError, Result};
pub use order_book::{MatchReport, OrderBook, PriceLevel};
