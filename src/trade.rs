//! Trade records and the append-only trade log.
//!
//! A [`Trade`] links the bid and ask orders that were matched, at the price
//! set by the resting order. Trades are immutable once created; the log only
//! ever appends.

use crate::clock::Timestamp;
use crate::order;
use crate::order::{Price, Symbol, Volume};
use crate::seq;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Unique identifier for trades.
pub type Id = u64;

/// A single execution between a bid and an ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Trade id, strictly increasing across the process.
    pub id: Id,
    pub symbol: Symbol,
    /// The buy side of the execution.
    pub bid_order_id: order::Id,
    /// The sell side of the execution.
    pub ask_order_id: order::Id,
    /// Execution price. Always the resting order's limit price.
    pub price: Price,
    /// Executed volume, possibly a partial fill of either order.
    pub volume: Volume,
    /// Arrival time of the aggressing order.
    pub timestamp: Timestamp,
}

impl Trade {
    /// Called by the matching loop only.
    pub(crate) fn new(
        symbol: Symbol,
        bid_order_id: order::Id,
        ask_order_id: order::Id,
        price: Price,
        volume: Volume,
        timestamp: Timestamp,
    ) -> Self {
        Trade {
            id: seq::next_trade_id(),
            symbol,
            bid_order_id,
            ask_order_id,
            price,
            volume,
            timestamp,
        }
    }

    /// Price times volume.
    pub fn notional(&self) -> f64 {
        self.price * self.volume as f64
    }
}

#[derive(Debug)]
struct LogInner {
    trades: Vec<Trade>,
    total_volume: Volume,
    total_notional: f64,
}

/// Append-only sink for executed trades with aggregate statistics.
///
/// Aggregates are maintained incrementally on append. The log synchronizes
/// internally, so one instance can be shared by every book behind a gateway;
/// appends from concurrent submits may interleave, but each `add_all` batch
/// lands contiguously.
#[derive(Debug)]
pub struct TradeLog {
    inner: Mutex<LogInner>,
}

impl TradeLog {
    pub fn new() -> Self {
        TradeLog::with_capacity(1024)
    }

    /// Pre-allocate room for `capacity` trades.
    pub fn with_capacity(capacity: usize) -> Self {
        TradeLog {
            inner: Mutex::new(LogInner {
                trades: Vec::with_capacity(capacity),
                total_volume: 0,
                total_notional: 0.0,
            }),
        }
    }

    /// Append one trade.
    pub fn add(&self, trade: Trade) {
        let mut inner = self.inner.lock();
        inner.total_volume += trade.volume;
        inner.total_notional += trade.notional();
        inner.trades.push(trade);
    }

    /// Append a batch of trades as one contiguous run.
    pub fn add_all(&self, trades: &[Trade]) {
        let mut inner = self.inner.lock();
        for trade in trades {
            inner.total_volume += trade.volume;
            inner.total_notional += trade.notional();
        }
        inner.trades.extend_from_slice(trades);
    }

    /// Number of trades recorded.
    pub fn count(&self) -> usize {
        self.inner.lock().trades.len()
    }

    /// Sum of executed volumes.
    pub fn total_volume(&self) -> Volume {
        self.inner.lock().total_volume
    }

    /// Sum of price times volume over all trades.
    pub fn total_notional(&self) -> f64 {
        self.inner.lock().total_notional
    }

    /// Volume-weighted average price; 0 while no volume has traded.
    pub fn vwap(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.total_volume == 0 {
            return 0.0;
        }
        inner.total_notional / inner.total_volume as f64
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        TradeLog::new()
    }
}
