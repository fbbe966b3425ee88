//! The agent trait and the dispatch context.
//!
//! Agents are registered with the kernel and driven entirely by callbacks:
//! message delivery and periodic triggers. Callbacks run synchronously to
//! completion on the kernel's single thread of control; "waking up later"
//! is expressed as a future-dated message, never a blocking call.

use tracing::trace;
use types::{AgentId, Message, OrderId, SimDuration, SimTime};

use crate::queue::{Envelope, MessageQueue};

// =============================================================================
// Periodic Triggers
// =============================================================================

/// Fixed-interval actions fired by the kernel's step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Exchange agents refresh their analytics aggregators.
    AnalyticsRefresh,
    /// Trading agents may request a fresh market-data snapshot.
    MarketDataPoll,
    /// Trading agents run their periodic strategy logic.
    WakeUp,
}

// =============================================================================
// Id Source
// =============================================================================

/// Allocator for order ids and message sequence numbers.
///
/// Owned by the kernel and handed to agents through the dispatch context,
/// so ids are strictly increasing per run and reset with the kernel, with
/// no process-global state.
#[derive(Debug, Default)]
pub struct IdSource {
    next_order: u64,
    next_seq: u64,
}

impl IdSource {
    /// Create a fresh allocator.
    pub fn new() -> Self {
        Self {
            next_order: 1,
            next_seq: 0,
        }
    }

    /// Issue the next order id.
    pub fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order);
        self.next_order += 1;
        id
    }

    /// Issue the next message sequence number.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

// =============================================================================
// Kernel Context
// =============================================================================

/// Mutable view of the kernel handed to an agent callback.
///
/// Sending always goes through the queue: a zero delay schedules delivery
/// for the current time but the message still waits for a drain pass, so a
/// callback can never re-enter another agent synchronously.
pub struct KernelCtx<'a> {
    now: SimTime,
    exchange_id: Option<AgentId>,
    queue: &'a mut MessageQueue,
    ids: &'a mut IdSource,
    suppressed: &'a mut u64,
}

impl<'a> KernelCtx<'a> {
    /// Assemble a context from its parts. The kernel does this on every
    /// dispatch; standalone construction is useful for driving agents in
    /// tests and custom harnesses.
    pub fn new(
        now: SimTime,
        exchange_id: Option<AgentId>,
        queue: &'a mut MessageQueue,
        ids: &'a mut IdSource,
        suppressed: &'a mut u64,
    ) -> Self {
        Self {
            now,
            exchange_id,
            queue,
            ids,
            suppressed,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Id of the primary exchange agent, if one is mounted.
    pub fn exchange_id(&self) -> Option<AgentId> {
        self.exchange_id
    }

    /// Allocate the next order id.
    pub fn next_order_id(&mut self) -> OrderId {
        self.ids.next_order_id()
    }

    /// Queue a message for delivery after `delay` milliseconds.
    ///
    /// Messages to [`AgentId::MARKET`] are silently suppressed: the
    /// historical replay participant has no mailbox. Every other recipient
    /// must be registered, or dispatch will abort the run.
    pub fn send_message(
        &mut self,
        sender: AgentId,
        recipient: AgentId,
        message: Message,
        delay: SimDuration,
    ) {
        if recipient.is_market() {
            *self.suppressed += 1;
            trace!(%sender, kind = %message.kind(), "suppressed message to replay participant");
            return;
        }
        let envelope = Envelope {
            deliver_at: self.now + delay,
            seq: self.ids.next_seq(),
            sender,
            recipient,
            message,
        };
        self.queue.push(envelope);
    }
}

// =============================================================================
// Agent Trait
// =============================================================================

/// A participant in the simulation, driven by kernel callbacks.
///
/// Implementations handle the message variants they understand and ignore
/// the rest; an unrecognized message is never an error.
pub trait Agent {
    /// Unique identifier for this agent.
    fn id(&self) -> AgentId;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "agent"
    }

    /// Called once before the first step, at the session start time.
    fn on_start(&mut self, _ctx: &mut KernelCtx<'_>) {}

    /// Called when a message addressed to this agent is delivered.
    fn on_message(&mut self, ctx: &mut KernelCtx<'_>, message: Message);

    /// Called on every periodic trigger firing; match on the kinds this
    /// agent cares about.
    fn on_trigger(&mut self, _ctx: &mut KernelCtx<'_>, _trigger: Trigger) {}

    /// Called once after the loop terminates.
    fn on_stop(&mut self, _final_time: SimTime) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_source_is_strictly_increasing() {
        let mut ids = IdSource::new();
        let a = ids.next_order_id();
        let b = ids.next_order_id();
        assert!(b > a);
        assert_eq!(ids.next_seq(), 0);
        assert_eq!(ids.next_seq(), 1);
    }

    #[test]
    fn test_ctx_send_assigns_sequence_and_delay() {
        let mut queue = MessageQueue::new();
        let mut ids = IdSource::new();
        let mut suppressed = 0;
        let mut ctx = KernelCtx::new(100, None, &mut queue, &mut ids, &mut suppressed);

        ctx.send_message(AgentId(1), AgentId(2), Message::WakeUp, 50);
        ctx.send_message(AgentId(1), AgentId(2), Message::WakeUp, 0);

        assert_eq!(queue.len(), 2);
        let first = queue.pop_due(200).unwrap();
        assert_eq!(first.deliver_at, 100);
        assert_eq!(first.seq, 1);
        let second = queue.pop_due(200).unwrap();
        assert_eq!(second.deliver_at, 150);
        assert_eq!(second.seq, 0);
    }

    #[test]
    fn test_sends_to_market_are_suppressed() {
        let mut queue = MessageQueue::new();
        let mut ids = IdSource::new();
        let mut suppressed = 0;
        let mut ctx = KernelCtx::new(0, None, &mut queue, &mut ids, &mut suppressed);

        ctx.send_message(AgentId(1), AgentId::MARKET, Message::WakeUp, 0);

        assert!(queue.is_empty());
        assert_eq!(suppressed, 1);
    }
}
