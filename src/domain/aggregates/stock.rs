//! Per-store stock and its adjustment journal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, StockEvent};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStock {
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason { Restock, Manual, Sale, Cancellation }

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restock => "restock",
            Self::Manual => "manual",
            Self::Sale => "sale",
            Self::Cancellation => "cancellation",
        }
    }
}

impl std::str::FromStr for AdjustmentReason {
    type Err = StockError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restock" => Ok(Self::Restock),
            "manual" => Ok(Self::Manual),
            "sale" => Ok(Self::Sale),
            "cancellation" => Ok(Self::Cancellation),
            other => Err(StockError::UnknownReason(other.to_string())),
        }
    }
}

/// Audit record of a single stock change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub delta: i32,
    pub quantity_after: i32,
    pub reason: AdjustmentReason,
    pub order_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who and why, attached to an adjustment.
#[derive(Clone, Debug, Default)]
pub struct AdjustmentContext {
    pub order_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
}

impl StoreStock {
    pub fn empty(store_id: Uuid, product_id: Uuid) -> Self { Self { store_id, product_id, quantity: 0 } }

    pub fn can_fulfil(&self, qty: u32) -> bool { i64::from(self.quantity) >= i64::from(qty) }

    /// Applies `delta` and returns the journal entry. The quantity never drops below zero.
    pub fn apply(&mut self, delta: i32, reason: AdjustmentReason, ctx: AdjustmentContext) -> Result<StockAdjustment, StockError> {
        if delta == 0 { return Err(StockError::ZeroDelta); }
        let after = self.quantity.checked_add(delta).ok_or(StockError::Overflow)?;
        if after < 0 {
            return Err(StockError::InsufficientStock { product_id: self.product_id, available: self.quantity, requested: delta.unsigned_abs() });
        }
        self.quantity = after;
        Ok(StockAdjustment {
            id: Uuid::now_v7(), store_id: self.store_id, product_id: self.product_id,
            delta, quantity_after: after, reason,
            order_id: ctx.order_id, actor_id: ctx.actor_id, note: ctx.note,
            created_at: Utc::now(),
        })
    }

    pub fn take(&mut self, qty: u32, order_id: Uuid) -> Result<StockAdjustment, StockError> {
        let delta = i32::try_from(qty).map_err(|_| StockError::Overflow)?;
        self.apply(-delta, AdjustmentReason::Sale, AdjustmentContext { order_id: Some(order_id), ..Default::default() })
    }

    pub fn restore(&mut self, qty: u32, order_id: Uuid) -> Result<StockAdjustment, StockError> {
        let delta = i32::try_from(qty).map_err(|_| StockError::Overflow)?;
        self.apply(delta, AdjustmentReason::Cancellation, AdjustmentContext { order_id: Some(order_id), ..Default::default() })
    }
}

impl StockAdjustment {
    pub fn events(&self) -> Vec<DomainEvent> {
        let mut events = vec![DomainEvent::Stock(StockEvent::Adjusted {
            store_id: self.store_id, product_id: self.product_id, delta: self.delta, quantity_after: self.quantity_after,
        })];
        if self.quantity_after == 0 {
            events.push(DomainEvent::Stock(StockEvent::Depleted { store_id: self.store_id, product_id: self.product_id }));
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockError {
    #[error("insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock { product_id: Uuid, available: i32, requested: u32 },
    #[error("adjustment must change the quantity")]
    ZeroDelta,
    #[error("stock quantity overflow")]
    Overflow,
    #[error("unknown adjustment reason {0:?}")]
    UnknownReason(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_and_restore_journal() {
        let order = Uuid::new_v4();
        let mut stock = StoreStock { store_id: Uuid::new_v4(), product_id: Uuid::new_v4(), quantity: 5 };
        let sale = stock.take(3, order).unwrap();
        assert_eq!((sale.delta, sale.quantity_after, sale.reason), (-3, 2, AdjustmentReason::Sale));
        assert_eq!(sale.order_id, Some(order));
        let back = stock.restore(3, order).unwrap();
        assert_eq!((back.delta, back.quantity_after), (3, 5));
    }

    #[test]
    fn test_never_negative() {
        let mut stock = StoreStock { store_id: Uuid::nil(), product_id: Uuid::nil(), quantity: 2 };
        let err = stock.take(3, Uuid::nil()).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { available: 2, requested: 3, .. }));
        assert_eq!(stock.quantity, 2);
        assert_eq!(stock.apply(0, AdjustmentReason::Manual, AdjustmentContext::default()).unwrap_err(), StockError::ZeroDelta);
    }

    #[test]
    fn test_depleted_event() {
        let mut stock = StoreStock { store_id: Uuid::nil(), product_id: Uuid::nil(), quantity: 1 };
        let adj = stock.take(1, Uuid::nil()).unwrap();
        assert_eq!(adj.events().len(), 2);
    }
}
