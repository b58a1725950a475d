//! Domain events
use crate::domain::value_objects::Money;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Stock(StockEvent),
    Referral(ReferralEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, store_id: Uuid, total: Money },
    ProofUploaded { order_id: Uuid },
    PaymentRejected { order_id: Uuid },
    Paid { order_id: Uuid, reference: Option<String> },
    Shipped { order_id: Uuid },
    Delivered { order_id: Uuid },
    Cancelled { order_id: Uuid, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StockEvent {
    Adjusted { store_id: Uuid, product_id: Uuid, delta: i32, quantity_after: i32 },
    Depleted { store_id: Uuid, product_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReferralEvent {
    Used { referrer_id: Uuid, referee_id: Uuid },
    Rewarded { referrer_id: Uuid, voucher_id: Uuid },
}

impl DomainEvent {
    /// NATS subject, e.g. `freshcart.order.paid`.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::ProofUploaded { .. } => "proof_uploaded",
                OrderEvent::PaymentRejected { .. } => "payment_rejected",
                OrderEvent::Paid { .. } => "paid",
                OrderEvent::Shipped { .. } => "shipped",
                OrderEvent::Delivered { .. } => "delivered",
                OrderEvent::Cancelled { .. } => "cancelled",
            }),
            Self::Stock(e) => ("stock", match e {
                StockEvent::Adjusted { .. } => "adjusted",
                StockEvent::Depleted { .. } => "depleted",
            }),
            Self::Referral(e) => ("referral", match e {
                ReferralEvent::Used { .. } => "used",
                ReferralEvent::Rewarded { .. } => "rewarded",
            }),
        };
        format!("freshcart.{aggregate}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_naming() {
        let e = DomainEvent::Order(OrderEvent::Paid { order_id: Uuid::nil(), reference: None });
        assert_eq!(e.subject(), "freshcart.order.paid");
        let e = DomainEvent::Stock(StockEvent::Depleted { store_id: Uuid::nil(), product_id: Uuid::nil() });
        assert_eq!(e.subject(), "freshcart.stock.depleted");
    }
}
