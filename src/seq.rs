//! Process-wide identifier sequences.
//!
//! Orders and trades draw their ids from two independent atomic counters.
//! Each call returns a value strictly greater than every value previously
//! returned from the same counter, under any number of concurrent callers.
//! These operations cannot fail; overflow is not a concern with 64 bits of
//! headroom.

use std::sync::atomic::{AtomicU64, Ordering};

/// A value drawn from an identifier sequence.
pub type Seq = u64;

static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);
static TRADE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Allocate the next order id. The first id issued is 1.
pub fn next_order_id() -> Seq {
    ORDER_SEQ.fetch_add(1, Ordering::Relaxed) + 1
}

/// Allocate the next trade id. The first id issued is 1.
pub fn next_trade_id() -> Seq {
    TRADE_SEQ.fetch_add(1, Ordering::Relaxed) + 1
}
