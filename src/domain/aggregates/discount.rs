//! Product-level promotional discounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::{Money, Percentage};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage { percent: Percentage },
    /// Amount off every unit.
    Nominal { amount: Money },
    /// Every second unit of the line is free.
    BuyOneGetOne,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage { .. } => "percentage",
            Self::Nominal { .. } => "nominal",
            Self::BuyOneGetOne => "buy_one_get_one",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub kind: DiscountKind,
    pub min_purchase: Option<Money>,
    pub max_discount: Option<Money>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
}

/// The effect of a discount on one cart line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineDiscount {
    pub amount: Money,
    pub free_quantity: u32,
}

impl Discount {
    pub fn new(
        store_id: Uuid, product_id: Uuid, kind: DiscountKind,
        min_purchase: Option<Money>, max_discount: Option<Money>,
        starts_at: DateTime<Utc>, ends_at: DateTime<Utc>,
    ) -> Result<Self, DiscountError> {
        if ends_at <= starts_at { return Err(DiscountError::InvalidPeriod); }
        if let DiscountKind::Nominal { amount } = &kind {
            if amount.is_zero() || amount.is_negative() { return Err(DiscountError::InvalidAmount); }
        }
        if max_discount.is_some_and(|m| m.is_zero() || m.is_negative()) { return Err(DiscountError::InvalidAmount); }
        Ok(Self { id: Uuid::now_v7(), store_id, product_id, kind, min_purchase, max_discount, starts_at, ends_at, is_active: true })
    }

    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now <= self.ends_at
    }

    /// Discount on a line of `quantity` units at `unit_price`, or `None` when the rule does not apply.
    pub fn apply_to_line(&self, unit_price: Money, quantity: u32, now: DateTime<Utc>) -> Option<LineDiscount> {
        if !self.is_running(now) || quantity == 0 { return None; }
        let gross = unit_price.times(quantity);
        if self.min_purchase.is_some_and(|min| gross < min) { return None; }
        let line = match &self.kind {
            DiscountKind::Percentage { percent } => LineDiscount {
                amount: gross.percent(*percent).cap(self.max_discount),
                free_quantity: 0,
            },
            DiscountKind::Nominal { amount } => LineDiscount {
                amount: (*amount).min(unit_price).times(quantity).cap(self.max_discount),
                free_quantity: 0,
            },
            DiscountKind::BuyOneGetOne => {
                let free = quantity / 2;
                LineDiscount { amount: unit_price.times(free).cap(self.max_discount), free_quantity: free }
            }
        };
        (!line.amount.is_zero()).then_some(line)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiscountError {
    #[error("discount must end after it starts")]
    InvalidPeriod,
    #[error("discount amounts must be positive")]
    InvalidAmount,
    #[error("unknown discount kind {0:?}")]
    UnknownKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn discount(kind: DiscountKind, min: Option<i64>, max: Option<i64>) -> Discount {
        let now = Utc::now();
        Discount::new(Uuid::nil(), Uuid::nil(), kind, min.map(Money::rupiah), max.map(Money::rupiah), now - Duration::days(1), now + Duration::days(1)).unwrap()
    }

    fn pct(v: i64) -> DiscountKind { DiscountKind::Percentage { percent: Percentage::new(Decimal::from(v)).unwrap() } }

    #[test]
    fn test_percentage_with_cap() {
        let d = discount(pct(20), None, Some(5_000));
        let got = d.apply_to_line(Money::rupiah(10_000), 2, Utc::now()).unwrap();
        assert_eq!(got.amount, Money::rupiah(4_000));
        let got = d.apply_to_line(Money::rupiah(10_000), 5, Utc::now()).unwrap();
        assert_eq!(got.amount, Money::rupiah(5_000));
    }

    #[test]
    fn test_nominal_per_unit_capped_at_price() {
        let d = discount(DiscountKind::Nominal { amount: Money::rupiah(3_000) }, None, None);
        assert_eq!(d.apply_to_line(Money::rupiah(10_000), 3, Utc::now()).unwrap().amount, Money::rupiah(9_000));
        let d = discount(DiscountKind::Nominal { amount: Money::rupiah(15_000) }, None, None);
        assert_eq!(d.apply_to_line(Money::rupiah(10_000), 1, Utc::now()).unwrap().amount, Money::rupiah(10_000));
    }

    #[test]
    fn test_min_purchase_gate() {
        let d = discount(pct(10), Some(50_000), None);
        assert!(d.apply_to_line(Money::rupiah(10_000), 4, Utc::now()).is_none());
        assert!(d.apply_to_line(Money::rupiah(10_000), 5, Utc::now()).is_some());
    }

    #[test]
    fn test_buy_one_get_one() {
        let d = discount(DiscountKind::BuyOneGetOne, None, None);
        assert!(d.apply_to_line(Money::rupiah(8_000), 1, Utc::now()).is_none());
        let got = d.apply_to_line(Money::rupiah(8_000), 5, Utc::now()).unwrap();
        assert_eq!(got, LineDiscount { amount: Money::rupiah(16_000), free_quantity: 2 });
    }

    #[test]
    fn test_outside_period_or_inactive() {
        let mut d = discount(pct(10), None, None);
        assert!(d.apply_to_line(Money::rupiah(1_000), 1, Utc::now() + Duration::days(2)).is_none());
        d.is_active = false;
        assert!(d.apply_to_line(Money::rupiah(1_000), 1, Utc::now()).is_none());
    }

    #[test]
    fn test_invalid_period_rejected() {
        let now = Utc::now();
        let err = Discount::new(Uuid::nil(), Uuid::nil(), pct(10), None, None, now, now).unwrap_err();
        assert_eq!(err, DiscountError::InvalidPeriod);
    }
}
