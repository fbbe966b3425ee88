//! End-to-end session: replay feed → kernel → exchange → trading agent.
//!
//! Drives a scripted buyer through a full kernel run against recorded
//! liquidity and checks fills, acknowledgements, snapshot contents, the
//! fee-sign cash convention, and run-to-run determinism.

use std::cell::RefCell;
use std::rc::Rc;

use agents::TraderState;
use kernel::{
    Agent, ExchangeAgent, Kernel, KernelConfig, KernelCtx, RecordedFeed, ReplayOrder, RunSummary,
    Trigger,
};
use types::{
    AgentId, Cash, FeeSchedule, Message, MessageKind, Price, Quantity, Side, SimTime,
};

const SYMBOL: &str = "ACME";
const EXCHANGE: AgentId = AgentId(1);
const BUYER: AgentId = AgentId(2);

/// Places one BUY 8 @ 101 limit order on its first wake-up, then just
/// accounts for everything the exchange sends back.
struct ScriptedBuyer {
    state: TraderState,
    log: Rc<RefCell<Vec<(SimTime, Message)>>>,
    report: Rc<RefCell<Option<(Cash, i64, i64)>>>,
    placed: bool,
}

impl Agent for ScriptedBuyer {
    fn id(&self) -> AgentId {
        BUYER
    }

    fn on_message(&mut self, ctx: &mut KernelCtx<'_>, message: Message) {
        self.log.borrow_mut().push((ctx.now(), message.clone()));
        self.state.apply(&message);
    }

    fn on_trigger(&mut self, ctx: &mut KernelCtx<'_>, trigger: Trigger) {
        match trigger {
            Trigger::MarketDataPoll => {
                if let Some(exchange) = ctx.exchange_id() {
                    ctx.send_message(
                        BUYER,
                        exchange,
                        Message::RequestMarketData { requester: BUYER },
                        0,
                    );
                }
            }
            Trigger::WakeUp if !self.placed => {
                self.placed = true;
                self.state.place_limit_order(
                    ctx,
                    BUYER,
                    SYMBOL,
                    Quantity(8),
                    Side::Buy,
                    Price::from_float(101.0),
                );
            }
            _ => {}
        }
    }

    fn on_stop(&mut self, _final_time: SimTime) {
        *self.report.borrow_mut() = Some((
            self.state.cash(),
            self.state.position_for(SYMBOL),
            self.state.pending_for(SYMBOL),
        ));
    }
}

fn feed() -> RecordedFeed {
    RecordedFeed::new(
        SYMBOL,
        vec![
            (
                0,
                ReplayOrder {
                    id: 1,
                    side: Side::Buy,
                    price: Price::from_float(99.0),
                    volume: Quantity(10),
                },
            ),
            (
                0,
                ReplayOrder {
                    id: 2,
                    side: Side::Sell,
                    price: Price::from_float(101.0),
                    volume: Quantity(5),
                },
            ),
            (
                2000,
                ReplayOrder {
                    id: 3,
                    side: Side::Sell,
                    price: Price::from_float(102.0),
                    volume: Quantity(50),
                },
            ),
        ],
    )
}

type SessionOutcome = (
    RunSummary,
    Vec<(SimTime, Message)>,
    (Cash, i64, i64),
);

fn run_session(seed: u64) -> SessionOutcome {
    let log = Rc::new(RefCell::new(Vec::new()));
    let report = Rc::new(RefCell::new(None));

    let exchange = ExchangeAgent::new(
        EXCHANGE,
        [SYMBOL],
        5,
        FeeSchedule::new(Cash::from_float(0.10), Cash::from_float(-0.25)),
    );
    let buyer = ScriptedBuyer {
        state: TraderState::new(Cash::from_float(100_000.0)),
        log: log.clone(),
        report: report.clone(),
        placed: false,
    };

    let mut kernel = Kernel::new(KernelConfig::default().with_seed(seed));
    kernel.mount_exchange(exchange).unwrap();
    kernel.add_agent(Box::new(buyer)).unwrap();
    let summary = kernel.run(&feed()).unwrap();

    let log = log.borrow().clone();
    let report = report.borrow().expect("buyer reported on stop");
    (summary, log, report)
}

#[test]
fn test_replay_session_fills_and_accounting() {
    let (summary, log, (cash, position, pending)) = run_session(7);

    assert_eq!(summary.start_time, 0);
    assert_eq!(summary.end_time, 2000);
    assert_eq!(summary.replayed_orders, 3);
    assert!(summary.delivered > 0);

    // The buyer's marketable limit lifted the 5@101 offer. Taker leg:
    // fee -0.25, notional 5 * 101 debited. The 3-lot remainder rested.
    assert_eq!(cash, Cash::from_float(100_000.0 - 0.25 - 505.0));
    assert_eq!(position, 5);
    assert_eq!(pending, 3);

    // Acknowledgement precedes the execution leg (creation order at the
    // same delivery time).
    let kinds: Vec<MessageKind> = log.iter().map(|(_, m)| m.kind()).collect();
    let accepted_at = kinds
        .iter()
        .position(|k| *k == MessageKind::OrderAccepted)
        .expect("rest acknowledged");
    let executed_at = kinds
        .iter()
        .position(|k| *k == MessageKind::OrderExecuted)
        .expect("fill delivered");
    assert!(accepted_at < executed_at);

    let (fill_time, fill) = log
        .iter()
        .find_map(|(t, m)| match m {
            Message::OrderExecuted(f) => Some((*t, f.clone())),
            _ => None,
        })
        .expect("fill delivered");
    assert_eq!(fill_time, 500);
    assert_eq!(fill.side, Side::Buy);
    assert_eq!(fill.quantity, Quantity(5));
    // Price improvement never applies: the trade prints at the resting
    // order's price.
    assert_eq!(fill.price, Price::from_float(101.0));
    assert_eq!(fill.fee, Cash::from_float(-0.25));
}

#[test]
fn test_market_data_snapshots_reflect_replayed_book() {
    let (_, log, _) = run_session(7);

    let first_snapshot = log
        .iter()
        .find_map(|(t, m)| match m {
            Message::MarketData(s) => Some((*t, s.clone())),
            _ => None,
        })
        .expect("snapshot delivered");

    let (time, snapshot) = first_snapshot;
    assert_eq!(time, 100);
    assert_eq!(snapshot.symbol, SYMBOL);
    // Replayed liquidity: bid 10@99, ask 5@101.
    assert_eq!(snapshot.best_bid(), Some(Price::from_float(99.0)));
    assert_eq!(snapshot.best_ask(), Some(Price::from_float(101.0)));
    assert_eq!(snapshot.mid_price, Some(Price::from_float(100.0)));
    // Book is bid-heavy: 10 vs 5.
    assert!(snapshot.order_strength > 0.0);
}

#[test]
fn test_sessions_replay_deterministically() {
    let first = run_session(42);
    let second = run_session(42);

    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert_eq!(first.2, second.2);
}
