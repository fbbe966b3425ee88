//! Replay feed: the historical-order data source.
//!
//! A [`ReplaySource`] is a thin, ordered source of recorded limit orders
//! keyed by timestamp. The kernel consumes it at wiring time, scheduling
//! each record as a limit-order message into the exchange's mailbox with a
//! small seeded jitter. [`RecordedFeed`] is the in-memory implementation,
//! buildable from records directly or from a serde-JSON document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use types::{Price, Quantity, Side, SimTime, Symbol};

/// One recorded order from the historical feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOrder {
    /// External id carried by the recorded feed (kept for traceability;
    /// the kernel assigns its own order ids at injection).
    pub id: u64,
    /// Side of the recorded order.
    pub side: Side,
    /// Recorded limit price.
    pub price: Price,
    /// Recorded volume.
    pub volume: Quantity,
}

/// An ordered source of historical orders for one instrument.
pub trait ReplaySource {
    /// Instrument the feed replays.
    fn symbol(&self) -> &str;

    /// First recorded timestamp (the session start).
    fn start_time(&self) -> SimTime;

    /// Last recorded timestamp (the session end).
    fn end_time(&self) -> SimTime;

    /// All distinct timestamps, ascending.
    fn timestamps(&self) -> &[SimTime];

    /// Orders recorded at `timestamp`, in recorded order.
    fn orders_at(&self, timestamp: SimTime) -> &[ReplayOrder];
}

// =============================================================================
// Recorded Feed
// =============================================================================

/// Serialized form of a recorded feed.
#[derive(Debug, Deserialize, Serialize)]
struct FeedDocument {
    symbol: Symbol,
    records: Vec<FeedRecord>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FeedRecord {
    timestamp: SimTime,
    #[serde(flatten)]
    order: ReplayOrder,
}

/// In-memory replay feed grouped by timestamp.
#[derive(Debug, Clone)]
pub struct RecordedFeed {
    symbol: Symbol,
    start_time: SimTime,
    end_time: SimTime,
    timestamps: Vec<SimTime>,
    orders: HashMap<SimTime, Vec<ReplayOrder>>,
}

impl RecordedFeed {
    /// Build a feed from `(timestamp, order)` records.
    ///
    /// Records are grouped by timestamp; within a timestamp the given order
    /// is preserved. The session horizon spans the first to last timestamp.
    pub fn new(symbol: impl Into<Symbol>, records: Vec<(SimTime, ReplayOrder)>) -> Self {
        let mut orders: HashMap<SimTime, Vec<ReplayOrder>> = HashMap::new();
        let mut timestamps: Vec<SimTime> = Vec::new();
        for (timestamp, order) in records {
            orders.entry(timestamp).or_default().push(order);
        }
        timestamps.extend(orders.keys().copied());
        timestamps.sort_unstable();

        let start_time = timestamps.first().copied().unwrap_or(0);
        let end_time = timestamps.last().copied().unwrap_or(0);
        Self {
            symbol: symbol.into(),
            start_time,
            end_time,
            timestamps,
            orders,
        }
    }

    /// Build an empty feed spanning an explicit horizon. Useful when the
    /// simulation is driven purely by agents.
    pub fn with_horizon(symbol: impl Into<Symbol>, start: SimTime, end: SimTime) -> Self {
        Self {
            symbol: symbol.into(),
            start_time: start,
            end_time: end,
            timestamps: Vec::new(),
            orders: HashMap::new(),
        }
    }

    /// Parse a feed from a JSON document of the form
    /// `{"symbol": "...", "records": [{"timestamp", "id", "side", "price", "volume"}, ...]}`.
    pub fn from_json_reader(reader: impl std::io::Read) -> serde_json::Result<Self> {
        let document: FeedDocument = serde_json::from_reader(reader)?;
        let records = document
            .records
            .into_iter()
            .map(|r| (r.timestamp, r.order))
            .collect();
        Ok(Self::new(document.symbol, records))
    }

    /// Total number of recorded orders.
    pub fn order_count(&self) -> usize {
        self.orders.values().map(Vec::len).sum()
    }
}

impl ReplaySource for RecordedFeed {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn start_time(&self) -> SimTime {
        self.start_time
    }

    fn end_time(&self) -> SimTime {
        self.end_time
    }

    fn timestamps(&self) -> &[SimTime] {
        &self.timestamps
    }

    fn orders_at(&self, timestamp: SimTime) -> &[ReplayOrder] {
        self.orders
            .get(&timestamp)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
