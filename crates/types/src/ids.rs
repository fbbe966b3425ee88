//! Core identifier and time types for the market simulator.
//!
//! This module defines the fundamental ID types used throughout the system
//! to uniquely identify orders and agents, plus the simulated-time aliases.

use derive_more::{Add, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Price scale factor: 10,000 means 4 decimal places.
/// - `10000` = $1.00
/// - `1` = $0.0001 (the indivisible price tick)
pub const PRICE_SCALE: i64 = 10_000;

// =============================================================================
// Core ID Types
// =============================================================================

/// Unique identifier for an order.
///
/// Issued by the kernel's id source; strictly increasing within a run and
/// never reused.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    From,
    Into,
)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order#{}", self.0)
    }
}

/// Unique identifier for an agent (exchange or trader).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    From,
    Into,
)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Reserved id for the historical replay participant. Orders injected
    /// from a replay feed carry this id; it has no mailbox, so the kernel
    /// suppresses anything addressed to it instead of treating the send as
    /// an unregistered-recipient error.
    pub const MARKET: AgentId = AgentId(0);

    /// Whether this is the reserved replay-participant id.
    #[inline]
    pub fn is_market(self) -> bool {
        self == Self::MARKET
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_market() {
            write!(f, "Agent#market")
        } else {
            write!(f, "Agent#{}", self.0)
        }
    }
}

// =============================================================================
// Symbol Type
// =============================================================================

/// Instrument symbol (e.g., "ACME").
pub type Symbol = String;

// =============================================================================
// Time Types
// =============================================================================

/// Simulated time in milliseconds since an arbitrary session origin.
pub type SimTime = u64;

/// A span of simulated time in milliseconds.
pub type SimDuration = u64;
