//! Shared value types for the discrete-event market simulator.
//!
//! This leaf crate defines the vocabulary the rest of the workspace speaks:
//! - Identifier newtypes and simulated-time aliases
//! - Fixed-point money types (`Price`, `Cash`, `Quantity`)
//! - Order records with a closed market/limit variant
//! - Fill legs and the fee schedule
//! - Depth levels and copy-on-read market snapshots
//! - The typed message contract between agents

mod ids;
mod market_data;
mod message;
mod money;
mod order;
mod trade;

pub use ids::{AgentId, OrderId, PRICE_SCALE, SimDuration, SimTime, Symbol};
pub use market_data::{BookLevel, MarketSnapshot};
pub use message::{Message, MessageKind};
pub use money::{Cash, Price, Quantity};
pub use order::{Order, OrderType, Side};
pub use trade::{FeeSchedule, FilledOrder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_fixed_point_round_trip() {
        let p = Price::from_float(101.25);
        assert_eq!(p.raw(), 1_012_500);
        assert!((p.to_float() - 101.25).abs() < 1e-9);
    }

    #[test]
    fn test_notional_value() {
        let value = Price::from_float(100.0) * Quantity(50);
        assert_eq!(value, Cash::from_float(5_000.0));
    }

    #[test]
    fn test_side_opposite_and_sign() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert_eq!(Side::Buy.sign(), 1);
        assert_eq!(Side::Sell.sign(), -1);
    }

    #[test]
    fn test_order_limit_price() {
        let limit = Order::limit(
            AgentId(1),
            "ACME",
            Side::Buy,
            Price::from_float(100.0),
            Quantity(10),
        );
        assert_eq!(limit.limit_price(), Some(Price::from_float(100.0)));
        assert_eq!(limit.remaining_quantity, 10);

        let market = Order::market(AgentId(1), "ACME", Side::Sell, Quantity(5));
        assert_eq!(market.limit_price(), None);
    }

    #[test]
    fn test_message_kind_tags() {
        let order = Order::market(AgentId(1), "ACME", Side::Buy, Quantity(1));
        assert_eq!(
            Message::MarketOrder(order).kind(),
            MessageKind::MarketOrder
        );
        assert_eq!(Message::WakeUp.kind(), MessageKind::WakeUp);
        assert_eq!(
            Message::RequestMarketData {
                requester: AgentId(3)
            }
            .kind(),
            MessageKind::RequestMarketData
        );
    }

    #[test]
    fn test_market_agent_id_reserved() {
        assert!(AgentId::MARKET.is_market());
        assert!(!AgentId(1).is_market());
        assert_eq!(format!("{}", AgentId::MARKET), "Agent#market");
    }

    #[test]
    fn test_snapshot_best_prices() {
        let snap = MarketSnapshot {
            symbol: "ACME".into(),
            buy_side: vec![BookLevel {
                price: Price::from_float(99.0),
                quantity: Quantity(10),
                order_count: 1,
            }],
            sell_side: vec![BookLevel {
                price: Price::from_float(101.0),
                quantity: Quantity(20),
                order_count: 2,
            }],
            ..Default::default()
        };
        assert_eq!(snap.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(snap.best_ask(), Some(Price::from_float(101.0)));
        assert_eq!(snap.volume_buy(), Quantity(10));
        assert_eq!(snap.volume_sell(), Quantity(20));
    }
}
