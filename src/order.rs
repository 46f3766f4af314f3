//! Order types and lifecycle.
//!
//! An [`Order`] carries its identity, side, execution kind, status, price and
//! volume. Factories stamp a fresh id and arrival time; after that the id and
//! timestamp never change. Status transitions are driven exclusively by the
//! matching loop and by cancellation:
//!
//! ```text
//! Open --partial fill--> Partial --more fills--> Filled
//!   |                       |
//!   |                       +--cancel--> Canceled
//!   +--cancel--> Canceled
//!   +--reject at gateway--> Rejected (terminal, never enters a book)
//! ```

use crate::clock::{self, Timestamp};
use crate::seq;
use serde::{Deserialize, Serialize};

/// Unique identifier for orders.
pub type Id = u64;
/// Instrument key, e.g. "AAPL".
pub type Symbol = String;
/// Limit price. Market orders carry 0.
pub type Price = f64;
/// Quantity in shares/lots.
pub type Volume = u64;

/// Side of the book an order belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// Execution behavior of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// Executes at the limit price or better, rests otherwise.
    Limit,
    /// Executes at the best available prices, residual is canceled.
    Market,
    /// Executes what it can at its limit immediately, residual is canceled.
    Ioc,
}

/// Lifecycle state of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Open,
    Partial,
    Filled,
    Canceled,
    Rejected,
}

/// The central value object of the engine.
///
/// While resting, an order is owned by the book that holds it; callers keep
/// the id and interact through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Id,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: Kind,
    pub status: Status,
    pub price: Price,
    pub volume: Volume,
    pub executed_volume: Volume,
    /// Arrival time. FIFO tie-break at equal prices.
    pub timestamp: Timestamp,
}

impl Order {
    fn new(symbol: Symbol, side: Side, kind: Kind, price: Price, volume: Volume) -> Self {
        Order {
            id: seq::next_order_id(),
            symbol,
            side,
            kind,
            status: Status::Open,
            price,
            volume,
            executed_volume: 0,
            timestamp: clock::now(),
        }
    }

    /// A limit order: executes at `price` or better, rests otherwise.
    pub fn limit(symbol: impl Into<Symbol>, side: Side, price: Price, volume: Volume) -> Self {
        Order::new(symbol.into(), side, Kind::Limit, price, volume)
    }

    /// A market order: executes at the best available prices, never rests.
    pub fn market(symbol: impl Into<Symbol>, side: Side, volume: Volume) -> Self {
        Order::new(symbol.into(), side, Kind::Market, 0.0, volume)
    }

    /// An immediate-or-cancel order: a limit order whose residual is canceled
    /// instead of resting.
    pub fn immediate_or_cancel(
        symbol: impl Into<Symbol>,
        side: Side,
        price: Price,
        volume: Volume,
    ) -> Self {
        Order::new(symbol.into(), side, Kind::Ioc, price, volume)
    }

    /// Volume still to be executed.
    pub fn remaining_volume(&self) -> Volume {
        self.volume - self.executed_volume
    }

    /// Whether the order is completely executed.
    pub fn is_filled(&self) -> bool {
        self.executed_volume >= self.volume
    }

    /// Whether the order is still eligible to match.
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Open | Status::Partial)
    }
}

pub mod book;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_factory_stamps_identity_and_defaults() {
        let a = Order::limit("AAPL", Side::Bid, 189.0, 100);
        let b = Order::limit("AAPL", Side::Ask, 190.0, 50);

        assert!(b.id > a.id, "ids must increase with creation order");
        assert!(b.timestamp >= a.timestamp, "timestamps must not go backwards");
        assert_eq!(a.status, Status::Open);
        assert_eq!(a.executed_volume, 0);
        assert_eq!(a.kind, Kind::Limit);
        assert_eq!(a.remaining_volume(), 100);
    }

    #[test]
    fn market_factory_stores_zero_price() {
        let o = Order::market("MSFT", Side::Ask, 10);
        assert_eq!(o.kind, Kind::Market);
        assert_eq!(o.price, 0.0, "market orders carry no limit price");
    }

    #[test]
    fn ioc_factory_keeps_its_limit_price() {
        let o = Order::immediate_or_cancel("AAPL", Side::Bid, 101.5, 10);
        assert_eq!(o.kind, Kind::Ioc);
        assert_eq!(o.price, 101.5);
    }

    #[test]
    fn remaining_and_filled_track_executed_volume() {
        let mut o = Order::limit("AAPL", Side::Bid, 189.0, 100);
        o.executed_volume = 40;
        assert_eq!(o.remaining_volume(), 60);
        assert!(!o.is_filled());

        o.executed_volume = 100;
        assert_eq!(o.remaining_volume(), 0);
        assert!(o.is_filled());
    }

    #[test]
    fn activity_follows_status() {
        let mut o = Order::limit("AAPL", Side::Bid, 189.0, 100);
        assert!(o.is_active(), "open orders are active");

        o.status = Status::Partial;
        assert!(o.is_active(), "partially executed orders are active");

        for terminal in [Status::Filled, Status::Canceled, Status::Rejected] {
            o.status = terminal;
            assert!(!o.is_active(), "{terminal:?} orders must be inactive");
        }
    }
}
