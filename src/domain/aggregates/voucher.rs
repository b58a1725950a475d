//! Vouchers: user-redeemable codes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::{Code, Money, Percentage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoucherScope {
    Total,
    Product { product_id: Uuid },
    Shipping,
}

impl VoucherScope {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Total => "total", Self::Product { .. } => "product", Self::Shipping => "shipping" }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoucherValue {
    Percentage { percent: Percentage },
    Nominal { amount: Money },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub code: Code,
    pub scope: VoucherScope,
    pub value: VoucherValue,
    pub max_discount: Option<Money>,
    pub min_purchase: Option<Money>,
    /// Personal vouchers can only be redeemed by their owner.
    pub owner_id: Option<Uuid>,
    /// Store-bound vouchers only apply to orders of that store.
    pub store_id: Option<Uuid>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Everything needed to decide whether a customer may redeem a voucher on an order.
#[derive(Clone, Copy, Debug)]
pub struct VoucherClaim<'a> {
    pub voucher: &'a Voucher,
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub previously_redeemed: bool,
}

impl Voucher {
    pub fn issue(code: Code, scope: VoucherScope, value: VoucherValue, starts_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Result<Self, VoucherError> {
        if expires_at <= starts_at { return Err(VoucherError::InvalidPeriod); }
        if let VoucherValue::Nominal { amount } = &value {
            if amount.is_zero() || amount.is_negative() { return Err(VoucherError::InvalidAmount); }
        }
        Ok(Self {
            id: Uuid::now_v7(), code, scope, value, max_discount: None, min_purchase: None,
            owner_id: None, store_id: None, usage_limit: None, used_count: 0, starts_at, expires_at,
        })
    }

    pub fn is_exhausted(&self) -> bool { self.usage_limit.is_some_and(|limit| self.used_count >= limit) }

    /// Checks every redemption rule that does not depend on the cart contents.
    pub fn check_claim(&self, claim: &VoucherClaim<'_>, now: DateTime<Utc>) -> Result<(), VoucherError> {
        if now < self.starts_at { return Err(VoucherError::NotYetActive); }
        if now > self.expires_at { return Err(VoucherError::Expired); }
        if self.owner_id.is_some_and(|owner| owner != claim.customer_id) { return Err(VoucherError::NotOwner); }
        if self.store_id.is_some_and(|store| store != claim.store_id) { return Err(VoucherError::WrongStore); }
        if self.is_exhausted() { return Err(VoucherError::Exhausted); }
        if claim.previously_redeemed { return Err(VoucherError::AlreadyRedeemed); }
        Ok(())
    }

    /// Discount against `base`, never more than the base itself.
    pub fn discount_on(&self, base: Money) -> Money {
        let raw = match &self.value {
            VoucherValue::Percentage { percent } => base.percent(*percent).cap(self.max_discount),
            VoucherValue::Nominal { amount } => amount.cap(self.max_discount),
        };
        raw.min(base)
    }

    pub fn redeem(&mut self) -> Result<(), VoucherError> {
        if self.is_exhausted() { return Err(VoucherError::Exhausted); }
        self.used_count += 1;
        Ok(())
    }

    pub fn release(&mut self) { self.used_count = self.used_count.saturating_sub(1); }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoucherError {
    #[error("voucher is not active yet")]
    NotYetActive,
    #[error("voucher has expired")]
    Expired,
    #[error("voucher belongs to another customer")]
    NotOwner,
    #[error("voucher is not valid for this store")]
    WrongStore,
    #[error("voucher usage limit reached")]
    Exhausted,
    #[error("voucher was already redeemed")]
    AlreadyRedeemed,
    #[error("minimum purchase of {0} not met")]
    MinPurchaseNotMet(Money),
    #[error("voucher product is not in the cart")]
    ProductNotInCart,
    #[error("voucher must expire after it starts")]
    InvalidPeriod,
    #[error("voucher amounts must be positive")]
    InvalidAmount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher(value: VoucherValue) -> Voucher {
        let now = Utc::now();
        Voucher::issue(Code::new("HEMAT10").unwrap(), VoucherScope::Total, value, now - Duration::hours(1), now + Duration::days(1)).unwrap()
    }

    fn claim(v: &Voucher, customer: Uuid) -> VoucherClaim<'_> {
        VoucherClaim { voucher: v, customer_id: customer, store_id: Uuid::nil(), previously_redeemed: false }
    }

    #[test]
    fn test_owner_and_store_restrictions() {
        let owner = Uuid::new_v4();
        let mut v = voucher(VoucherValue::Nominal { amount: Money::rupiah(10_000) });
        v.owner_id = Some(owner);
        assert_eq!(v.check_claim(&claim(&v, Uuid::new_v4()), Utc::now()), Err(VoucherError::NotOwner));
        assert!(v.check_claim(&claim(&v, owner), Utc::now()).is_ok());
        v.store_id = Some(Uuid::new_v4());
        assert_eq!(v.check_claim(&claim(&v, owner), Utc::now()), Err(VoucherError::WrongStore));
    }

    #[test]
    fn test_time_window_and_usage() {
        let mut v = voucher(VoucherValue::Nominal { amount: Money::rupiah(10_000) });
        let c = Uuid::new_v4();
        assert_eq!(v.check_claim(&claim(&v, c), Utc::now() + Duration::days(2)), Err(VoucherError::Expired));
        assert_eq!(v.check_claim(&claim(&v, c), Utc::now() - Duration::days(2)), Err(VoucherError::NotYetActive));
        v.usage_limit = Some(1);
        v.redeem().unwrap();
        assert_eq!(v.redeem(), Err(VoucherError::Exhausted));
        v.release();
        assert_eq!(v.used_count, 0);
        let mut redeemed = claim(&v, c);
        redeemed.previously_redeemed = true;
        assert_eq!(v.check_claim(&redeemed, Utc::now()), Err(VoucherError::AlreadyRedeemed));
    }

    #[test]
    fn test_discount_capped_by_base_and_max() {
        let v = voucher(VoucherValue::Nominal { amount: Money::rupiah(50_000) });
        assert_eq!(v.discount_on(Money::rupiah(20_000)), Money::rupiah(20_000));
        let mut v = voucher(VoucherValue::Percentage { percent: Percentage::new(rust_decimal::Decimal::from(50)).unwrap() });
        v.max_discount = Some(Money::rupiah(15_000));
        assert_eq!(v.discount_on(Money::rupiah(100_000)), Money::rupiah(15_000));
        assert_eq!(v.discount_on(Money::rupiah(10_000)), Money::rupiah(5_000));
    }
}
