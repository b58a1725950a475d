//! Order Aggregate
//!
//! Status flow:
//!
//! ```text
//! awaiting_payment --proof--> awaiting_confirmation --approve--> processing --ship--> shipped --confirm--> delivered
//!        ^                            |
//!        +----------reject------------+
//! awaiting_payment --gateway settlement--> processing
//! awaiting_payment | awaiting_confirmation | processing --cancel--> cancelled
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    AwaitingConfirmation,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_paid(&self) -> bool { matches!(self, Self::Processing | Self::Shipped | Self::Delivered) }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Gateway, ManualTransfer }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Gateway => "gateway", Self::ManualTransfer => "manual_transfer" }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway" => Ok(Self::Gateway),
            "manual_transfer" => Ok(Self::ManualTransfer),
            other => Err(OrderError::UnknownValue(other.to_string())),
        }
    }
}

/// Who is asking for a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelActor {
    /// The customer who placed the order.
    Customer,
    /// A store admin of the order's store, or a super admin.
    Admin,
    /// Payment deadline expiry or a gateway failure notification.
    System,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub free_quantity: u32,
    pub discount: Money,
    pub total: Money,
}

/// Persisted and serialized form of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub product_discount: Money,
    pub voucher_discount: Money,
    pub shipping_cost: Money,
    pub shipping_discount: Money,
    pub total: Money,
    pub voucher_id: Option<Uuid>,
    pub shipping_address: ShippingAddress,
    pub payment_proof_url: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_deadline: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

#[derive(Clone, Debug)]
pub struct Order {
    state: OrderSnapshot,
    events: Vec<DomainEvent>,
}

/// Stock to put back on the shelf after a cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockRelease {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl Order {
    pub fn place(
        user_id: Uuid,
        store_id: Uuid,
        payment_method: PaymentMethod,
        pricing: &PriceBreakdown,
        shipping_address: ShippingAddress,
        payment_window: Duration,
    ) -> Result<Self, OrderError> {
        if pricing.lines.is_empty() { return Err(OrderError::NoItems); }
        let now = Utc::now();
        let id = Uuid::now_v7();
        let items = pricing.lines.iter().map(|l| OrderLine {
            id: Uuid::now_v7(),
            product_id: l.product_id,
            name: l.name.clone(),
            unit_price: l.unit_price,
            quantity: l.quantity,
            free_quantity: l.free_quantity,
            discount: l.discount,
            total: l.net,
        }).collect();
        let state = OrderSnapshot {
            id,
            order_number: order_number(now),
            user_id,
            store_id,
            status: OrderStatus::AwaitingPayment,
            payment_method,
            subtotal: pricing.subtotal,
            product_discount: pricing.product_discount,
            voucher_discount: pricing.voucher_discount,
            shipping_cost: pricing.shipping_cost,
            shipping_discount: pricing.shipping_discount,
            total: pricing.total,
            voucher_id: pricing.voucher_id,
            shipping_address,
            payment_proof_url: None,
            payment_reference: None,
            payment_deadline: now + payment_window,
            paid_at: None, shipped_at: None, delivered_at: None, cancelled_at: None, cancel_reason: None,
            created_at: now,
            updated_at: now,
            items,
        };
        let mut order = Self { state, events: vec![] };
        order.raise(OrderEvent::Placed { order_id: id, store_id, total: pricing.total });
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.state.id }
    pub fn user_id(&self) -> Uuid { self.state.user_id }
    pub fn store_id(&self) -> Uuid { self.state.store_id }
    pub fn status(&self) -> OrderStatus { self.state.status }
    pub fn total(&self) -> Money { self.state.total }
    pub fn payment_method(&self) -> PaymentMethod { self.state.payment_method }
    pub fn items(&self) -> &[OrderLine] { &self.state.items }
    pub fn voucher_id(&self) -> Option<Uuid> { self.state.voucher_id }
    pub fn snapshot(&self) -> &OrderSnapshot { &self.state }
    pub fn into_snapshot(self) -> OrderSnapshot { self.state }

    /// Whether a transfer proof would be accepted right now.
    pub fn accepts_payment_proof(&self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.require_status(OrderStatus::AwaitingPayment, "upload payment proof")?;
        self.require_method(PaymentMethod::ManualTransfer)?;
        if now > self.state.payment_deadline { return Err(OrderError::PaymentDeadlinePassed); }
        Ok(())
    }

    pub fn attach_payment_proof(&mut self, url: String, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.accepts_payment_proof(now)?;
        self.state.payment_proof_url = Some(url);
        self.state.status = OrderStatus::AwaitingConfirmation;
        self.touch(now);
        self.raise(OrderEvent::ProofUploaded { order_id: self.state.id });
        Ok(())
    }

    pub fn approve_payment(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.require_status(OrderStatus::AwaitingConfirmation, "approve payment")?;
        self.mark_paid(None, now);
        Ok(())
    }

    /// Sends the order back to awaiting payment with a fresh deadline.
    pub fn reject_payment(&mut self, new_deadline: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.require_status(OrderStatus::AwaitingConfirmation, "reject payment")?;
        self.state.status = OrderStatus::AwaitingPayment;
        self.state.payment_proof_url = None;
        self.state.payment_deadline = new_deadline;
        self.touch(now);
        self.raise(OrderEvent::PaymentRejected { order_id: self.state.id });
        Ok(())
    }

    /// Gateway settlement. Returns `false` when the same settlement was already applied.
    pub fn record_gateway_payment(&mut self, reference: String, now: DateTime<Utc>) -> Result<bool, OrderError> {
        self.require_method(PaymentMethod::Gateway)?;
        if self.state.status.is_paid() && self.state.payment_reference.as_deref() == Some(reference.as_str()) {
            return Ok(false);
        }
        self.require_status(OrderStatus::AwaitingPayment, "settle payment")?;
        self.mark_paid(Some(reference), now);
        Ok(true)
    }

    pub fn ship(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.require_status(OrderStatus::Processing, "ship")?;
        self.state.status = OrderStatus::Shipped;
        self.state.shipped_at = Some(now);
        self.touch(now);
        self.raise(OrderEvent::Shipped { order_id: self.state.id });
        Ok(())
    }

    pub fn confirm_delivery(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.require_status(OrderStatus::Shipped, "confirm delivery")?;
        self.state.status = OrderStatus::Delivered;
        self.state.delivered_at = Some(now);
        self.touch(now);
        self.raise(OrderEvent::Delivered { order_id: self.state.id });
        Ok(())
    }

    /// Cancels and returns the stock to restore (paid units plus free units).
    pub fn cancel(&mut self, actor: CancelActor, reason: impl Into<String>, now: DateTime<Utc>) -> Result<Vec<StockRelease>, OrderError> {
        use OrderStatus::*;
        let allowed = match actor {
            CancelActor::Customer => matches!(self.state.status, AwaitingPayment),
            CancelActor::Admin => matches!(self.state.status, AwaitingPayment | AwaitingConfirmation | Processing),
            CancelActor::System => matches!(self.state.status, AwaitingPayment | AwaitingConfirmation),
        };
        if !allowed {
            return Err(OrderError::InvalidTransition { from: self.state.status, action: "cancel" });
        }
        let reason = reason.into();
        self.state.status = Cancelled;
        self.state.cancelled_at = Some(now);
        self.state.cancel_reason = Some(reason.clone());
        self.touch(now);
        self.raise(OrderEvent::Cancelled { order_id: self.state.id, reason });
        Ok(self.state.items.iter().map(|i| StockRelease { product_id: i.product_id, quantity: i.quantity }).collect())
    }

    pub fn is_payment_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state.status == OrderStatus::AwaitingPayment && now > self.state.payment_deadline
    }

    pub fn is_auto_confirm_due(&self, after: Duration, now: DateTime<Utc>) -> bool {
        self.state.status == OrderStatus::Shipped && self.state.shipped_at.is_some_and(|at| now >= at + after)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn mark_paid(&mut self, reference: Option<String>, now: DateTime<Utc>) {
        self.state.status = OrderStatus::Processing;
        self.state.paid_at = Some(now);
        if reference.is_some() { self.state.payment_reference = reference.clone(); }
        self.touch(now);
        self.raise(OrderEvent::Paid { order_id: self.state.id, reference });
    }

    fn require_status(&self, status: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.state.status != status {
            return Err(OrderError::InvalidTransition { from: self.state.status, action });
        }
        Ok(())
    }

    fn require_method(&self, method: PaymentMethod) -> Result<(), OrderError> {
        if self.state.payment_method != method {
            return Err(OrderError::WrongPaymentMethod { required: method });
        }
        Ok(())
    }

    fn raise(&mut self, e: OrderEvent) { self.events.push(DomainEvent::Order(e)); }
    fn touch(&mut self, now: DateTime<Utc>) { self.state.updated_at = now; }
}

impl From<OrderSnapshot> for Order {
    fn from(state: OrderSnapshot) -> Self { Self { state, events: vec![] } }
}

/// `ORD-YYYYMMDD-XXXXXX`
fn order_number(now: DateTime<Utc>) -> String {
    format!("ORD-{}-{:06X}", now.format("%Y%m%d"), rand::random::<u32>() & 0x00FF_FFFF)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("cannot {action}: order is {}", .from.as_str())]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error("only allowed for {} orders", .required.as_str())]
    WrongPaymentMethod { required: PaymentMethod },
    #[error("payment deadline has passed")]
    PaymentDeadlinePassed,
    #[error("unknown order value {0:?}")]
    UnknownValue(String),
}
