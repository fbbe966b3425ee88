//! The discrete-event kernel for the market simulator.
//!
//! This crate ties the simulation together:
//! - A simulated clock and a time-ordered message queue with a
//!   creation-order tie-break, giving a deterministic, replayable total
//!   delivery order
//! - The [`Agent`] trait and the dispatch context agents use to send
//!   messages and allocate order ids
//! - Periodic triggers (analytics refresh, market-data poll, wake-up)
//! - The [`ExchangeAgent`] wrapping one order book and one analytics
//!   aggregator per listed symbol
//! - The [`ReplaySource`] interface for historical order injection
//!
//! Everything runs on a single logical thread: agent callbacks execute
//! synchronously to completion before the loop continues, so no locking is
//! needed anywhere in the core.

mod agent;
mod config;
mod error;
mod exchange;
mod kernel;
mod oracle;
mod queue;

pub use agent::{Agent, IdSource, KernelCtx, Trigger};
pub use config::KernelConfig;
pub use error::{KernelError, Result};
pub use exchange::ExchangeAgent;
pub use kernel::{Kernel, RunSummary};
pub use oracle::{RecordedFeed, ReplayOrder, ReplaySource};
pub use queue::{Envelope, MessageQueue};
