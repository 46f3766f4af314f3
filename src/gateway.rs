//! Validation and routing of incoming orders.
//!
//! The gateway is the single entry point of the engine. It owns one
//! [`OrderBook`] per registered symbol (the set is fixed at construction),
//! validates every order before any book state is touched, routes it to the
//! right book, and forwards the produced trades to the trade log.

use crate::config::EngineConfig;
use crate::order::book::{OrderBook, Receipt};
use crate::order::{Id, Kind, Order, Price, Status, Symbol};
use crate::trade::TradeLog;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on limit prices. A guard against fat-fingered input, not a
/// market mechanism.
pub const MAX_LIMIT_PRICE: Price = 1_000_000.0;

/// Coarse classification of a validation failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectKind {
    Malformed,
    EmptyField,
    InvalidRange,
    OutOfBounds,
    UnknownSymbol,
}

/// A business-rule violation found before the order reached any book.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("order is already {0:?}; terminal orders cannot be resubmitted")]
    Terminal(Status),
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("symbol {0:?} is not traded on this venue")]
    UnknownSymbol(Symbol),
    #[error("volume must be greater than zero")]
    ZeroVolume,
    #[error("{kind:?} orders require a positive limit price, got {price}")]
    NonPositivePrice { kind: Kind, price: Price },
    #[error("limit price {price} exceeds the ceiling of {MAX_LIMIT_PRICE}")]
    PriceAboveCeiling { price: Price },
}

impl ValidationError {
    /// The order field the rule applies to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Terminal(_) => "status",
            ValidationError::EmptySymbol | ValidationError::UnknownSymbol(_) => "symbol",
            ValidationError::ZeroVolume => "volume",
            ValidationError::NonPositivePrice { .. } | ValidationError::PriceAboveCeiling { .. } => {
                "price"
            }
        }
    }

    pub fn kind(&self) -> RejectKind {
        match self {
            ValidationError::Terminal(_) => RejectKind::Malformed,
            ValidationError::EmptySymbol => RejectKind::EmptyField,
            ValidationError::UnknownSymbol(_) => RejectKind::UnknownSymbol,
            ValidationError::ZeroVolume | ValidationError::NonPositivePrice { .. } => {
                RejectKind::InvalidRange
            }
            ValidationError::PriceAboveCeiling { .. } => RejectKind::OutOfBounds,
        }
    }
}

/// A rejected submission. Carries the order back to the caller with its
/// status set to [`Status::Rejected`]; no book state was touched.
#[derive(Debug, Error)]
#[error("order #{} rejected: {}", .order.id, .error)]
pub struct Rejection {
    pub order: Order,
    #[source]
    pub error: ValidationError,
}

/// Failure modes of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("symbol {0:?} is not traded on this venue")]
    UnknownSymbol(Symbol),
    #[error("order #{0} not found or already inactive")]
    NotFound(Id),
}

/// The venue's front door: validation, routing, trade logging.
#[derive(Debug)]
pub struct Gateway {
    books: HashMap<Symbol, OrderBook>,
    log: Option<Arc<TradeLog>>,
}

impl Gateway {
    /// Build a venue with one empty book per symbol. The symbol set is
    /// immutable afterwards. The trade log is optional; without one, trades
    /// are only returned to callers.
    pub fn new<I, S>(symbols: I, log: Option<Arc<TradeLog>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let books = symbols
            .into_iter()
            .map(Into::into)
            .map(|symbol| (symbol.clone(), OrderBook::new(symbol)))
            .collect();
        Gateway { books, log }
    }

    /// Build a venue from configuration.
    pub fn from_config(config: &EngineConfig, log: Option<Arc<TradeLog>>) -> Self {
        Gateway::new(config.symbols.iter().cloned(), log)
    }

    /// Validate, route, match, and log.
    ///
    /// On rejection the order comes back inside the error with status
    /// [`Status::Rejected`] and no book has been touched.
    pub fn submit(&self, mut order: Order) -> Result<Receipt, Rejection> {
        let book = match self.validate(&order) {
            Ok(book) => book,
            Err(error) => {
                order.status = Status::Rejected;
                warn!(order_id = order.id, symbol = %order.symbol, %error, "rejected order");
                return Err(Rejection { order, error });
            }
        };

        let receipt = book.submit(order);
        if !receipt.trades.is_empty() {
            debug!(
                order_id = receipt.order_id,
                trades = receipt.trades.len(),
                status = ?receipt.status,
                "submission matched"
            );
        }
        if let Some(log) = &self.log {
            log.add_all(&receipt.trades);
        }
        Ok(receipt)
    }

    /// Cancel a resting order in the named book.
    pub fn cancel(&self, symbol: &str, order_id: Id) -> Result<(), CancelError> {
        let book = self
            .books
            .get(symbol)
            .ok_or_else(|| CancelError::UnknownSymbol(symbol.to_string()))?;
        if book.cancel(order_id) {
            Ok(())
        } else {
            Err(CancelError::NotFound(order_id))
        }
    }

    /// The book for a symbol, for read-only top-of-book queries.
    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Check every business rule in order; the first failure wins. Returns
    /// the target book so that validation and routing are a single pass.
    fn validate(&self, order: &Order) -> Result<&OrderBook, ValidationError> {
        if order.status != Status::Open {
            return Err(ValidationError::Terminal(order.status));
        }
        if order.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let Some(book) = self.books.get(&order.symbol) else {
            return Err(ValidationError::UnknownSymbol(order.symbol.clone()));
        };
        if order.volume == 0 {
            return Err(ValidationError::ZeroVolume);
        }
        // Market orders carry no limit price; limit and IOC orders must
        // price sanely.
        if matches!(order.kind, Kind::Limit | Kind::Ioc) {
            if !order.price.is_finite() || order.price <= 0.0 {
                return Err(ValidationError::NonPositivePrice {
                    kind: order.kind,
                    price: order.price,
                });
            }
            if order.price > MAX_LIMIT_PRICE {
                return Err(ValidationError::PriceAboveCeiling { price: order.price });
            }
        }
        Ok(book)
    }
}
