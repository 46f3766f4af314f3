//! Per-symbol limit order book with price-time (FIFO) priority.
//!
//! Each side is a binary heap keyed by (price, arrival time): bids prefer the
//! highest price, asks the lowest, and ties go to the earlier arrival. The
//! book owns every resting order and keeps an id index next to the heaps so
//! cancellation is an O(1) lookup.
//!
//! Cancellation uses lazy deletion: a canceled order is marked in place and
//! its heap entry is physically discarded the next time it surfaces at the
//! top of its side during matching. Removing from the middle of a heap would
//! be O(n).
//!
//! A reader/writer lock protects both sides. `submit` and `cancel` hold the
//! writer lock for the whole critical section; the top-of-book and depth
//! queries hold the reader lock and never mutate, so a reader that finds an
//! inactive entry on top reports that side as absent and leaves the cleanup
//! to the next writer.

use crate::clock::Timestamp;
use crate::order::{Id, Kind, Order, Price, Side, Status, Symbol, Volume};
use crate::trade::Trade;
use parking_lot::RwLock;
use std::cmp::{self, Ordering};
use std::collections::{BinaryHeap, HashMap};
use tracing::trace;

/// Outcome of a submit call.
///
/// The book owns the order once it rests, so the caller gets the final state
/// of the submission back by value: the id to cancel with later, the status
/// the matching loop left the order in, and every trade produced.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub order_id: Id,
    pub status: Status,
    pub executed_volume: Volume,
    pub remaining_volume: Volume,
    pub trades: Vec<Trade>,
}

/// Heap key for one side of the book.
///
/// Implementors order themselves so that the "best" order of their side is
/// the greatest element of a max-heap, with earlier arrivals winning ties.
trait SideEntry: Ord {
    fn of(order: &Order) -> Self;
    fn id(&self) -> Id;
}

/// Bid-side key: highest price first, then earliest arrival.
#[derive(Debug, Copy, Clone)]
struct BidEntry {
    price: Price,
    timestamp: Timestamp,
    id: Id,
}

impl SideEntry for BidEntry {
    fn of(order: &Order) -> Self {
        BidEntry {
            price: order.price,
            timestamp: order.timestamp,
            id: order.id,
        }
    }

    fn id(&self) -> Id {
        self.id
    }
}

impl Ord for BidEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .total_cmp(&other.price)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for BidEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BidEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BidEntry {}

/// Ask-side key: lowest price first, then earliest arrival.
#[derive(Debug, Copy, Clone)]
struct AskEntry {
    price: Price,
    timestamp: Timestamp,
    id: Id,
}

impl SideEntry for AskEntry {
    fn of(order: &Order) -> Self {
        AskEntry {
            price: order.price,
            timestamp: order.timestamp,
            id: order.id,
        }
    }

    fn id(&self) -> Id {
        self.id
    }
}

impl Ord for AskEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .price
            .total_cmp(&self.price)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for AskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AskEntry {}

#[derive(Debug, Default)]
struct BookInner {
    bids: BinaryHeap<BidEntry>,
    asks: BinaryHeap<AskEntry>,
    resting: HashMap<Id, Order>,
}

/// Order book for a single symbol.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    inner: RwLock<BookInner>,
}

impl OrderBook {
    /// Create an empty book for `symbol`.
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        OrderBook {
            symbol: symbol.into(),
            inner: RwLock::new(BookInner::default()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Match `incoming` against the opposite side and, for a limit order with
    /// residual volume, rest it on its own side.
    ///
    /// The book assumes the input has been validated by the gateway; matching
    /// itself cannot fail. The whole call runs under the writer lock, so no
    /// half-completed match is ever observable.
    pub fn submit(&self, mut incoming: Order) -> Receipt {
        let mut inner = self.inner.write();
        let BookInner {
            bids,
            asks,
            resting,
        } = &mut *inner;

        let trades = match incoming.side {
            Side::Bid => match_against(&self.symbol, asks, resting, &mut incoming),
            Side::Ask => match_against(&self.symbol, bids, resting, &mut incoming),
        };

        let rests = if incoming.is_filled() {
            incoming.status = Status::Filled;
            false
        } else {
            match incoming.kind {
                // Residuals of immediate-or-cancel and market orders are
                // discarded, never rested.
                Kind::Ioc | Kind::Market => {
                    incoming.status = Status::Canceled;
                    false
                }
                Kind::Limit => {
                    if incoming.executed_volume > 0 {
                        incoming.status = Status::Partial;
                    }
                    true
                }
            }
        };

        let receipt = Receipt {
            order_id: incoming.id,
            status: incoming.status,
            executed_volume: incoming.executed_volume,
            remaining_volume: incoming.remaining_volume(),
            trades,
        };

        if rests {
            match incoming.side {
                Side::Bid => bids.push(BidEntry::of(&incoming)),
                Side::Ask => asks.push(AskEntry::of(&incoming)),
            }
            resting.insert(incoming.id, incoming);
        }

        receipt
    }

    /// Cancel a resting order by id.
    ///
    /// The order is marked canceled in place; its heap entry stays behind and
    /// is discarded the next time it reaches the top of its side. Returns
    /// false when the id is unknown or the order is already inactive.
    pub fn cancel(&self, order_id: Id) -> bool {
        let mut inner = self.inner.write();
        match inner.resting.get_mut(&order_id) {
            Some(order) if order.is_active() => {
                order.status = Status::Canceled;
                true
            }
            _ => false,
        }
    }

    /// Best (highest) active bid price, if any.
    ///
    /// Readers never mutate: when the top entry belongs to an inactive order
    /// the side reports as absent until a writer cleans it up.
    pub fn best_bid(&self) -> Option<Price> {
        let inner = self.inner.read();
        let top = inner.bids.peek()?;
        let order = inner.resting.get(&top.id)?;
        order.is_active().then_some(order.price)
    }

    /// Best (lowest) active ask price, if any.
    pub fn best_ask(&self) -> Option<Price> {
        let inner = self.inner.read();
        let top = inner.asks.peek()?;
        let order = inner.resting.get(&top.id)?;
        order.is_active().then_some(order.price)
    }

    /// Best ask minus best bid, when both sides are present.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Number of active resting orders on each side, (bids, asks).
    ///
    /// Walks both heaps to skip lazy-deleted entries; this is a diagnostic,
    /// not a hot-path query.
    pub fn depth(&self) -> (usize, usize) {
        let inner = self.inner.read();
        let active = |id: &Id| inner.resting.get(id).is_some_and(Order::is_active);
        let bids = inner.bids.iter().filter(|e| active(&e.id)).count();
        let asks = inner.asks.iter().filter(|e| active(&e.id)).count();
        (bids, asks)
    }

    /// Snapshot of a resting active order.
    pub fn order(&self, order_id: Id) -> Option<Order> {
        let inner = self.inner.read();
        inner
            .resting
            .get(&order_id)
            .filter(|o| o.is_active())
            .cloned()
    }
}

/// The matching loop: executes `incoming` against the opposite-side heap
/// until it is filled, the opposite side is exhausted, or the price gate
/// stops it. The resting order always sets the execution price.
fn match_against<E: SideEntry>(
    symbol: &Symbol,
    opposite: &mut BinaryHeap<E>,
    resting: &mut HashMap<Id, Order>,
    incoming: &mut Order,
) -> Vec<Trade> {
    let mut trades = Vec::new();

    while incoming.remaining_volume() > 0 {
        let Some(top_id) = opposite.peek().map(SideEntry::id) else {
            break;
        };

        let Some(passive) = resting.get_mut(&top_id).filter(|o| o.is_active()) else {
            // Lazy deletion: the entry on top belongs to an order canceled
            // earlier. Drop it and look at the next one.
            opposite.pop();
            resting.remove(&top_id);
            trace!(order_id = top_id, symbol = %symbol, "discarded inactive book entry");
            continue;
        };

        // Market orders have no limit; limit and IOC orders only execute at
        // their price or better.
        if incoming.kind != Kind::Market {
            let crossed = match incoming.side {
                Side::Bid => incoming.price >= passive.price,
                Side::Ask => incoming.price <= passive.price,
            };
            if !crossed {
                break;
            }
        }

        let volume = cmp::min(incoming.remaining_volume(), passive.remaining_volume());
        let (bid_order_id, ask_order_id) = match incoming.side {
            Side::Bid => (incoming.id, passive.id),
            Side::Ask => (passive.id, incoming.id),
        };
        // The resting order sets the price; the aggressor accepts it.
        trades.push(Trade::new(
            symbol.clone(),
            bid_order_id,
            ask_order_id,
            passive.price,
            volume,
            incoming.timestamp,
        ));

        incoming.executed_volume += volume;
        passive.executed_volume += volume;

        if passive.is_filled() {
            passive.status = Status::Filled;
            opposite.pop();
            resting.remove(&top_id);
        } else {
            // Key unchanged, the partially filled order keeps the top spot.
            passive.status = Status::Partial;
        }
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;

    fn book() -> OrderBook {
        OrderBook::new("AAPL")
    }

    fn limit(side: Side, price: Price, volume: Volume) -> Order {
        Order::limit("AAPL", side, price, volume)
    }

    #[test]
    fn order_without_counterparty_rests_open() {
        let book = book();
        let receipt = book.submit(limit(Side::Bid, 189.0, 100));

        assert!(receipt.trades.is_empty(), "no opposite side, no trades");
        assert_eq!(receipt.status, Status::Open);
        assert_eq!(book.best_bid(), Some(189.0));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn full_match_executes_at_resting_price() {
        let book = book();
        let sell = book.submit(limit(Side::Ask, 189.0, 100));
        let buy = book.submit(limit(Side::Bid, 189.5, 100));

        assert_eq!(buy.trades.len(), 1, "expected one trade, got {:?}", buy.trades);
        let trade = &buy.trades[0];
        assert_eq!(trade.price, 189.0, "the resting ask sets the price");
        assert_eq!(trade.volume, 100);
        assert_eq!(trade.ask_order_id, sell.order_id);
        assert_eq!(trade.bid_order_id, buy.order_id);

        assert_eq!(buy.status, Status::Filled);
        assert_eq!(book.depth(), (0, 0), "book should be empty after a full cross");
    }

    #[test]
    fn partial_fill_leaves_residual_resting() {
        let book = book();
        book.submit(limit(Side::Ask, 189.0, 50));
        let buy = book.submit(limit(Side::Bid, 189.5, 100));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].price, 189.0);
        assert_eq!(buy.trades[0].volume, 50);

        assert_eq!(buy.status, Status::Partial);
        assert_eq!(buy.executed_volume, 50);
        assert_eq!(buy.remaining_volume, 50);

        assert_eq!(book.best_bid(), Some(189.5), "residual bid should rest");
        assert_eq!(book.best_ask(), None, "ask fully consumed");

        let resting = book.order(buy.order_id).expect("residual should be resting");
        assert_eq!(resting.status, Status::Partial);
        assert_eq!(resting.remaining_volume(), 50);
    }

    #[test]
    fn better_priced_order_beats_earlier_arrival() {
        let book = book();
        book.submit(limit(Side::Ask, 191.0, 100));
        let cheap = book.submit(limit(Side::Ask, 190.0, 100));

        let buy = book.submit(limit(Side::Bid, 191.0, 100));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(
            buy.trades[0].price, 190.0,
            "price priority violation: matched {} instead of the cheaper ask",
            buy.trades[0].price
        );
        assert_eq!(buy.trades[0].ask_order_id, cheap.order_id);
        assert_eq!(
            book.best_ask(),
            Some(191.0),
            "the earlier, more expensive ask should remain"
        );
    }

    #[test]
    fn fifo_wins_at_equal_price() {
        let book = book();
        let first = limit(Side::Ask, 190.0, 100);
        let mut second = limit(Side::Ask, 190.0, 100);
        // Force strictly distinct arrival times.
        second.timestamp = first.timestamp + 1_000;

        let first = book.submit(first);
        let second = book.submit(second);

        let buy = book.submit(limit(Side::Bid, 190.0, 100));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(
            buy.trades[0].ask_order_id, first.order_id,
            "FIFO violation: the earlier arrival at the same price must match first"
        );
        assert!(
            book.order(second.order_id).is_some(),
            "the later arrival should remain resting"
        );
    }

    #[test]
    fn market_order_takes_best_available_price() {
        let book = book();
        book.submit(limit(Side::Ask, 190.0, 100));
        book.submit(limit(Side::Ask, 191.0, 100));

        let buy = book.submit(Order::market("AAPL", Side::Bid, 100));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].price, 190.0);
        assert_eq!(buy.status, Status::Filled);
        assert_eq!(book.best_ask(), Some(191.0), "second level untouched");
        assert_eq!(book.best_bid(), None, "market orders never rest");
    }

    #[test]
    fn market_residual_is_canceled() {
        let book = book();
        book.submit(limit(Side::Ask, 190.0, 100));

        let buy = book.submit(Order::market("AAPL", Side::Bid, 150));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.status, Status::Canceled, "unfilled market residual cancels");
        assert_eq!(buy.executed_volume, 100);
        assert_eq!(buy.remaining_volume, 50);
        assert_eq!(book.depth(), (0, 0));
    }

    #[test]
    fn ioc_executes_then_cancels_residual() {
        let book = book();
        book.submit(limit(Side::Ask, 190.0, 50));

        let buy = book.submit(Order::immediate_or_cancel("AAPL", Side::Bid, 190.0, 100));

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].volume, 50);
        assert_eq!(buy.status, Status::Canceled);
        assert_eq!(book.best_bid(), None, "IOC residual must not rest");
    }

    #[test]
    fn ioc_honors_its_limit_price() {
        let book = book();
        book.submit(limit(Side::Ask, 191.0, 100));

        let buy = book.submit(Order::immediate_or_cancel("AAPL", Side::Bid, 190.0, 100));

        assert!(
            buy.trades.is_empty(),
            "an IOC must not execute beyond its limit, got {:?}",
            buy.trades
        );
        assert_eq!(buy.status, Status::Canceled);
        assert_eq!(book.best_ask(), Some(191.0));
    }

    #[test]
    fn canceled_order_never_matches() {
        let book = book();
        let buy = book.submit(limit(Side::Bid, 189.0, 100));

        assert!(book.cancel(buy.order_id));
        assert!(
            !book.cancel(buy.order_id),
            "second cancel of the same order must miss"
        );

        let sell = book.submit(limit(Side::Ask, 189.0, 100));
        assert!(
            sell.trades.is_empty(),
            "a canceled bid must not trade, got {:?}",
            sell.trades
        );
        assert_eq!(sell.status, Status::Open);
        assert_eq!(book.best_ask(), Some(189.0), "the sell should rest instead");
    }

    #[test]
    fn cancel_unknown_id_misses() {
        let book = book();
        assert!(!book.cancel(424242));
    }

    #[test]
    fn reader_hides_inactive_top_until_writer_cleans_up() {
        let book = book();
        let top = book.submit(limit(Side::Bid, 189.0, 100));
        book.submit(limit(Side::Bid, 188.0, 100));

        assert_eq!(book.best_bid(), Some(189.0));
        book.cancel(top.order_id);

        // The reader cannot mutate past the canceled entry.
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.depth(), (1, 0), "depth still counts only active orders");

        // Any writer pass over the bid side discards the stale entry.
        book.submit(limit(Side::Ask, 200.0, 1));
        assert_eq!(book.best_bid(), Some(188.0));
    }

    #[test]
    fn depth_counts_only_active_orders() {
        let book = book();
        book.submit(limit(Side::Bid, 189.0, 100));
        let second = book.submit(limit(Side::Bid, 188.0, 100));
        book.submit(limit(Side::Ask, 191.0, 100));

        assert_eq!(book.depth(), (2, 1));
        book.cancel(second.order_id);
        assert_eq!(book.depth(), (1, 1));
    }

    #[test]
    fn spread_requires_both_sides() {
        let book = book();
        assert_eq!(book.spread(), None);

        book.submit(limit(Side::Bid, 189.0, 100));
        assert_eq!(book.spread(), None, "one-sided book has no spread");

        book.submit(limit(Side::Ask, 190.0, 100));
        assert_eq!(book.spread(), Some(1.0));
    }

    #[test]
    fn aggressive_limit_sweeps_multiple_levels() {
        let book = book();
        book.submit(limit(Side::Ask, 190.0, 100));
        book.submit(limit(Side::Ask, 191.0, 100));

        let buy = book.submit(limit(Side::Bid, 195.0, 250));

        assert_eq!(buy.trades.len(), 2, "expected two trades, got {:?}", buy.trades);
        assert_eq!(buy.trades[0].price, 190.0);
        assert_eq!(buy.trades[0].volume, 100);
        assert_eq!(buy.trades[1].price, 191.0);
        assert_eq!(buy.trades[1].volume, 100);
        assert!(
            buy.trades[0].id < buy.trades[1].id,
            "trade ids must increase within a submission"
        );

        assert_eq!(buy.status, Status::Partial);
        assert_eq!(buy.executed_volume, 200);
        assert_eq!(book.best_bid(), Some(195.0), "residual 50 should rest");
        assert_eq!(book.best_ask(), None, "all asks consumed");

        let bought: Volume = buy.trades.iter().map(|t| t.volume).sum();
        assert_eq!(bought, buy.executed_volume, "both sides executed equal volume");
    }

    #[test]
    fn exactly_filled_passive_leaves_no_trace_on_top() {
        let book = book();
        let sell = book.submit(limit(Side::Ask, 190.0, 100));
        book.submit(limit(Side::Bid, 190.0, 100));

        assert_eq!(book.best_ask(), None);
        assert!(
            book.order(sell.order_id).is_none(),
            "a fully filled passive order must leave the book"
        );
    }

    #[test]
    fn partially_filled_passive_stays_on_top_and_keeps_matching() {
        let book = book();
        let sell = book.submit(limit(Side::Ask, 190.0, 100));

        book.submit(limit(Side::Bid, 190.0, 30));
        let resting = book.order(sell.order_id).expect("still resting");
        assert_eq!(resting.status, Status::Partial);
        assert_eq!(resting.remaining_volume(), 70);
        assert_eq!(book.best_ask(), Some(190.0));

        let buy = book.submit(limit(Side::Bid, 190.0, 70));
        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].volume, 70);
        assert_eq!(book.best_ask(), None);
    }
}
