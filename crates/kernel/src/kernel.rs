//! The discrete-event kernel: simulated clock, message dispatch, and the
//! step loop.
//!
//! Each loop iteration, while the clock is within the session horizon:
//! 1. Drain due messages: pop the queue minimum while its delivery time is
//!    at or before the clock and dispatch it to the addressed agent.
//! 2. Fire periodic triggers whose next fire time has been reached.
//! 3. Advance the clock to the next queued delivery time within the
//!    horizon, or by the minimum tick when none is pending.
//!
//! Dispatch to an unregistered recipient aborts the run: that is a wiring
//! bug, not a runtime condition. Messages still queued past the end time
//! are dropped, never delivered.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tracing::{debug, info, trace};
use types::{AgentId, Message, Order, SimTime};

use crate::agent::{Agent, IdSource, KernelCtx, Trigger};
use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::exchange::ExchangeAgent;
use crate::oracle::ReplaySource;
use crate::queue::{Envelope, MessageQueue};

// =============================================================================
// Run Phase
// =============================================================================

/// Lifecycle of a kernel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    PreRun,
    Running,
    Finished,
}

// =============================================================================
// Periodic Triggers
// =============================================================================

/// A fixed-interval trigger with its next fire time.
#[derive(Debug, Clone, Copy)]
struct PeriodicTrigger {
    kind: Trigger,
    interval: SimTime,
    next_fire: SimTime,
}

// =============================================================================
// Run Summary
// =============================================================================

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Session start time, from the feed.
    pub start_time: SimTime,
    /// Session end time, from the feed.
    pub end_time: SimTime,
    /// Clock value when the loop terminated.
    pub final_time: SimTime,
    /// Messages dispatched to agents.
    pub delivered: u64,
    /// Messages still queued past the end time, dropped at termination.
    pub dropped: u64,
    /// Messages addressed to the replay participant, suppressed at send.
    pub suppressed: u64,
    /// Replay orders injected into the exchange mailbox.
    pub replayed_orders: u64,
}

// =============================================================================
// Kernel
// =============================================================================

/// The simulation driver: owns the clock, the message queue, the agent
/// registry, and the id allocator.
pub struct Kernel {
    config: KernelConfig,
    phase: Phase,
    clock: SimTime,
    start_time: SimTime,
    end_time: SimTime,
    queue: MessageQueue,
    ids: IdSource,
    agents: Vec<Box<dyn Agent>>,
    registry: HashMap<AgentId, usize>,
    exchange_id: Option<AgentId>,
    triggers: Vec<PeriodicTrigger>,
    rng: StdRng,
    delivered: u64,
    suppressed: u64,
    replayed_orders: u64,
}

impl Kernel {
    /// Create an idle kernel with the given configuration.
    pub fn new(config: KernelConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            phase: Phase::Uninitialized,
            clock: 0,
            start_time: 0,
            end_time: 0,
            queue: MessageQueue::new(),
            ids: IdSource::new(),
            agents: Vec::new(),
            registry: HashMap::new(),
            exchange_id: None,
            triggers: Vec::new(),
            rng,
            delivered: 0,
            suppressed: 0,
            replayed_orders: 0,
        }
    }

    /// Register the exchange agent. The first exchange mounted becomes the
    /// primary one handed to trading agents through the context.
    pub fn mount_exchange(&mut self, exchange: ExchangeAgent) -> Result<()> {
        let id = exchange.id();
        if self.exchange_id.is_none() {
            self.exchange_id = Some(id);
        }
        self.register(Box::new(exchange))
    }

    /// Register a trading agent.
    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> Result<()> {
        self.register(agent)
    }

    fn register(&mut self, agent: Box<dyn Agent>) -> Result<()> {
        let id = agent.id();
        if self.registry.contains_key(&id) {
            return Err(KernelError::DuplicateAgent(id));
        }
        debug!(%id, name = agent.name(), "agent registered");
        self.registry.insert(id, self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Current simulated time.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Read-only access to a registered agent, for post-run inspection.
    pub fn agent(&self, id: AgentId) -> Option<&dyn Agent> {
        self.registry.get(&id).map(|&idx| self.agents[idx].as_ref())
    }

    /// Run the simulation over the feed's session horizon.
    ///
    /// Consumes the feed's records into the queue, steps the loop until the
    /// clock passes the end time, and returns the run counters. A kernel
    /// runs at most once; simulations are single-pass and deterministic
    /// under a fixed seed and inputs.
    pub fn run(&mut self, feed: &dyn ReplaySource) -> Result<RunSummary> {
        if self.phase != Phase::Uninitialized {
            return Err(KernelError::AlreadyRun);
        }
        self.pre_run(feed)?;

        self.phase = Phase::Running;
        while self.clock <= self.end_time {
            self.drain_due()?;
            self.fire_triggers();
            self.advance_clock();
        }

        Ok(self.finish())
    }

    /// Wire the session: set the horizon, prime the trigger schedule,
    /// notify agents, and schedule the feed's records with jitter.
    fn pre_run(&mut self, feed: &dyn ReplaySource) -> Result<()> {
        self.phase = Phase::PreRun;
        self.start_time = feed.start_time();
        self.end_time = feed.end_time();
        self.clock = self.start_time;

        self.triggers = vec![
            PeriodicTrigger {
                kind: Trigger::AnalyticsRefresh,
                interval: self.config.analytics_interval,
                next_fire: self.start_time + self.config.analytics_interval,
            },
            PeriodicTrigger {
                kind: Trigger::MarketDataPoll,
                interval: self.config.market_data_interval,
                next_fire: self.start_time + self.config.market_data_interval,
            },
            PeriodicTrigger {
                kind: Trigger::WakeUp,
                interval: self.config.wake_interval,
                next_fire: self.start_time + self.config.wake_interval,
            },
        ];

        info!(
            start = self.start_time,
            end = self.end_time,
            agents = self.agents.len(),
            "session wired"
        );

        for idx in 0..self.agents.len() {
            let mut ctx = KernelCtx::new(
                self.clock,
                self.exchange_id,
                &mut self.queue,
                &mut self.ids,
                &mut self.suppressed,
            );
            self.agents[idx].on_start(&mut ctx);
        }

        self.schedule_replay(feed)
    }

    /// Turn each recorded order into a limit-order message to the exchange,
    /// delivered at its recorded timestamp plus a small random jitter.
    fn schedule_replay(&mut self, feed: &dyn ReplaySource) -> Result<()> {
        if feed.timestamps().is_empty() {
            return Ok(());
        }
        let exchange = self.exchange_id.ok_or(KernelError::NoExchange)?;

        for &timestamp in feed.timestamps() {
            for record in feed.orders_at(timestamp) {
                let mut order = Order::limit(
                    AgentId::MARKET,
                    feed.symbol(),
                    record.side,
                    record.price,
                    record.volume,
                );
                order.id = self.ids.next_order_id();
                order.placed_at = timestamp;

                let jitter = if self.config.replay_jitter_max == 0 {
                    0
                } else {
                    self.rng.random_range(0..=self.config.replay_jitter_max)
                };
                trace!(external_id = record.id, order = %order.id, timestamp, jitter, "replay order scheduled");
                self.queue.push(Envelope {
                    deliver_at: timestamp + jitter,
                    seq: self.ids.next_seq(),
                    sender: AgentId::MARKET,
                    recipient: exchange,
                    message: Message::LimitOrder(order),
                });
                self.replayed_orders += 1;
            }
        }
        debug!(count = self.replayed_orders, "replay feed scheduled");
        Ok(())
    }

    /// Pop and dispatch every message due at the current clock.
    fn drain_due(&mut self) -> Result<()> {
        while let Some(envelope) = self.queue.pop_due(self.clock) {
            let idx = *self
                .registry
                .get(&envelope.recipient)
                .ok_or(KernelError::UnknownRecipient(envelope.recipient))?;
            trace!(
                time = self.clock,
                seq = envelope.seq,
                from = %envelope.sender,
                to = %envelope.recipient,
                kind = %envelope.message.kind(),
                "dispatch"
            );
            let mut ctx = KernelCtx::new(
                self.clock,
                self.exchange_id,
                &mut self.queue,
                &mut self.ids,
                &mut self.suppressed,
            );
            self.agents[idx].on_message(&mut ctx, envelope.message);
            self.delivered += 1;
        }
        Ok(())
    }

    /// Fire every periodic trigger whose next fire time has been reached.
    /// Several may fire in the same iteration.
    fn fire_triggers(&mut self) {
        let now = self.clock;
        let mut due: SmallVec<[Trigger; 4]> = SmallVec::new();
        for trigger in &mut self.triggers {
            while now >= trigger.next_fire {
                due.push(trigger.kind);
                trigger.next_fire += trigger.interval;
            }
        }
        for kind in due {
            for idx in 0..self.agents.len() {
                let mut ctx = KernelCtx::new(
                    self.clock,
                    self.exchange_id,
                    &mut self.queue,
                    &mut self.ids,
                    &mut self.suppressed,
                );
                self.agents[idx].on_trigger(&mut ctx, kind);
            }
        }
    }

    /// Jump to the next queued delivery time within the horizon; when the
    /// queue is empty or holds only post-end messages, advance by the
    /// minimum tick so the loop still terminates and triggers keep firing.
    fn advance_clock(&mut self) {
        self.clock = match self.queue.next_time() {
            Some(t) if t <= self.end_time => t.max(self.clock),
            _ => self.clock + self.config.min_tick,
        };
    }

    /// Terminate the session: drop undelivered messages, notify agents,
    /// and build the summary.
    fn finish(&mut self) -> RunSummary {
        self.phase = Phase::Finished;
        let dropped = self.queue.clear() as u64;
        for agent in &mut self.agents {
            agent.on_stop(self.clock);
        }
        let summary = RunSummary {
            start_time: self.start_time,
            end_time: self.end_time,
            final_time: self.clock,
            delivered: self.delivered,
            dropped,
            suppressed: self.suppressed,
            replayed_orders: self.replayed_orders,
        };
        info!(
            delivered = summary.delivered,
            dropped = summary.dropped,
            suppressed = summary.suppressed,
            "session finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{RecordedFeed, ReplayOrder};
    use std::cell::RefCell;
    use std::rc::Rc;
    use types::{MessageKind, Price, Quantity, Side};

    /// Records every delivery it sees; optionally sends a scripted batch of
    /// messages on start.
    struct Probe {
        id: AgentId,
        log: Rc<RefCell<Vec<(SimTime, MessageKind)>>>,
        on_start_sends: Vec<(AgentId, Message, SimTime)>,
    }

    impl Probe {
        fn new(id: u64, log: Rc<RefCell<Vec<(SimTime, MessageKind)>>>) -> Self {
            Self {
                id: AgentId(id),
                log,
                on_start_sends: Vec::new(),
            }
        }
    }

    impl Agent for Probe {
        fn id(&self) -> AgentId {
            self.id
        }

        fn on_start(&mut self, ctx: &mut KernelCtx<'_>) {
            for (recipient, message, delay) in self.on_start_sends.drain(..) {
                ctx.send_message(self.id, recipient, message, delay);
            }
        }

        fn on_message(&mut self, ctx: &mut KernelCtx<'_>, message: Message) {
            self.log.borrow_mut().push((ctx.now(), message.kind()));
        }
    }

    fn empty_feed(start: SimTime, end: SimTime) -> RecordedFeed {
        RecordedFeed::with_horizon("ACME", start, end)
    }

    #[test]
    fn test_equal_time_messages_deliver_in_creation_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sender = Probe::new(1, log.clone());
        // Same delivery time, created WakeUp-first.
        sender.on_start_sends = vec![
            (AgentId(2), Message::WakeUp, 40),
            (AgentId(2), Message::OrderAccepted(types::OrderId(9)), 40),
        ];
        let receiver = Probe::new(2, log.clone());

        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.add_agent(Box::new(sender)).unwrap();
        kernel.add_agent(Box::new(receiver)).unwrap();
        let summary = kernel.run(&empty_feed(0, 100)).unwrap();

        assert_eq!(summary.delivered, 2);
        let delivered = log.borrow();
        assert_eq!(delivered[0], (40, MessageKind::WakeUp));
        assert_eq!(delivered[1], (40, MessageKind::OrderAccepted));
    }

    #[test]
    fn test_messages_past_end_time_are_dropped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sender = Probe::new(1, log.clone());
        sender.on_start_sends = vec![
            (AgentId(2), Message::WakeUp, 50),
            (AgentId(2), Message::WakeUp, 500),
        ];
        let receiver = Probe::new(2, log.clone());

        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.add_agent(Box::new(sender)).unwrap();
        kernel.add_agent(Box::new(receiver)).unwrap();
        let summary = kernel.run(&empty_feed(0, 100)).unwrap();

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.dropped, 1);
        assert!(log.borrow().iter().all(|&(t, _)| t <= 100));
    }

    #[test]
    fn test_unregistered_recipient_aborts_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sender = Probe::new(1, log);
        sender.on_start_sends = vec![(AgentId(99), Message::WakeUp, 10)];

        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.add_agent(Box::new(sender)).unwrap();
        let err = kernel.run(&empty_feed(0, 100)).unwrap_err();

        assert_eq!(err, KernelError::UnknownRecipient(AgentId(99)));
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut kernel = Kernel::new(KernelConfig::default());
        kernel
            .add_agent(Box::new(Probe::new(1, log.clone())))
            .unwrap();
        let err = kernel.add_agent(Box::new(Probe::new(1, log))).unwrap_err();
        assert_eq!(err, KernelError::DuplicateAgent(AgentId(1)));
    }

    #[test]
    fn test_kernel_runs_once() {
        let mut kernel = Kernel::new(KernelConfig::default());
        kernel.run(&empty_feed(0, 10)).unwrap();
        assert_eq!(
            kernel.run(&empty_feed(0, 10)).unwrap_err(),
            KernelError::AlreadyRun
        );
    }

    /// Counts trigger firings per kind.
    struct TriggerProbe {
        id: AgentId,
        counts: Rc<RefCell<HashMap<Trigger, u64>>>,
    }

    impl Agent for TriggerProbe {
        fn id(&self) -> AgentId {
            self.id
        }
        fn on_message(&mut self, _ctx: &mut KernelCtx<'_>, _message: Message) {}
        fn on_trigger(&mut self, _ctx: &mut KernelCtx<'_>, trigger: Trigger) {
            *self.counts.borrow_mut().entry(trigger).or_default() += 1;
        }
    }

    #[test]
    fn test_periodic_triggers_fire_on_idle_queue() {
        let counts = Rc::new(RefCell::new(HashMap::new()));
        let probe = TriggerProbe {
            id: AgentId(1),
            counts: counts.clone(),
        };

        let config = KernelConfig::default()
            .with_min_tick(10)
            .with_analytics_interval(100)
            .with_market_data_interval(100)
            .with_wake_interval(500);
        let mut kernel = Kernel::new(config);
        kernel.add_agent(Box::new(probe)).unwrap();
        kernel.run(&empty_feed(0, 1000)).unwrap();

        let counts = counts.borrow();
        assert_eq!(counts.get(&Trigger::AnalyticsRefresh), Some(&10));
        assert_eq!(counts.get(&Trigger::MarketDataPoll), Some(&10));
        assert_eq!(counts.get(&Trigger::WakeUp), Some(&2));
    }

    #[test]
    fn test_replay_orders_reach_exchange_with_bounded_jitter() {
        let feed = RecordedFeed::new(
            "ACME",
            vec![
                (
                    100,
                    ReplayOrder {
                        id: 11,
                        side: Side::Buy,
                        price: Price::from_float(99.0),
                        volume: Quantity(10),
                    },
                ),
                (
                    200,
                    ReplayOrder {
                        id: 12,
                        side: Side::Sell,
                        price: Price::from_float(101.0),
                        volume: Quantity(5),
                    },
                ),
            ],
        );

        let exchange = ExchangeAgent::new(
            AgentId(1),
            ["ACME"],
            5,
            types::FeeSchedule::FREE,
        );
        let config = KernelConfig::default().with_replay_jitter_max(3);
        let mut kernel = Kernel::new(config);
        kernel.mount_exchange(exchange).unwrap();
        let summary = kernel.run(&feed).unwrap();

        assert_eq!(summary.replayed_orders, 2);
        // Both records delivered (jitter may push the tail one at most 3ms
        // past its 200ms timestamp, still inside the horizon... unless it
        // lands past end_time, in which case it is dropped).
        assert_eq!(summary.delivered + summary.dropped, 2);
        assert!(kernel.agent(AgentId(1)).is_some());
    }

    #[test]
    fn test_deterministic_replay_same_seed() {
        let build = || {
            RecordedFeed::new(
                "ACME",
                vec![
                    (
                        10,
                        ReplayOrder {
                            id: 1,
                            side: Side::Buy,
                            price: Price::from_float(99.0),
                            volume: Quantity(10),
                        },
                    ),
                    (
                        20,
                        ReplayOrder {
                            id: 2,
                            side: Side::Sell,
                            price: Price::from_float(99.0),
                            volume: Quantity(4),
                        },
                    ),
                ],
            )
        };

        let run = |seed: u64| -> RunSummary {
            let exchange =
                ExchangeAgent::new(AgentId(1), ["ACME"], 5, types::FeeSchedule::FREE);
            let mut kernel = Kernel::new(KernelConfig::default().with_seed(seed));
            kernel.mount_exchange(exchange).unwrap();
            kernel.run(&build()).unwrap()
        };

        assert_eq!(run(42), run(42));
    }
}
