//! Discount, voucher and shipping pricing for a checkout.
//!
//! [`calculate_discount`] is pure: callers load discounts and the voucher
//! (with its redemption history for the customer) and pass them in. The same
//! breakdown is used for the checkout preview and for the persisted order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::discount::{Discount, LineDiscount};
use crate::domain::aggregates::voucher::{VoucherClaim, VoucherError, VoucherScope};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Clone, Debug)]
pub struct PricingRequest<'a> {
    pub lines: &'a [PricingLine],
    pub discounts: &'a [Discount],
    pub voucher: Option<VoucherClaim<'a>>,
    pub shipping_cost: Money,
    pub now: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub free_quantity: u32,
    pub discount_id: Option<Uuid>,
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub product_discount: Money,
    pub voucher_id: Option<Uuid>,
    pub voucher_discount: Money,
    pub shipping_cost: Money,
    pub shipping_discount: Money,
    pub total: Money,
}

impl PriceBreakdown {
    pub fn total_discount(&self) -> Money { self.product_discount + self.voucher_discount + self.shipping_discount }
}

pub fn calculate_discount(req: &PricingRequest<'_>) -> Result<PriceBreakdown, PricingError> {
    if req.lines.is_empty() { return Err(PricingError::NoLines); }

    let lines: Vec<PricedLine> = req.lines.iter().map(|line| price_line(line, req.discounts, req.now)).collect::<Result<_, _>>()?;

    let subtotal: Money = lines.iter().map(|l| l.gross).sum();
    let product_discount: Money = lines.iter().map(|l| l.discount).sum();
    let after_products = subtotal.saturating_sub(product_discount);

    let mut voucher_id = None;
    let mut voucher_discount = Money::ZERO;
    let mut shipping_discount = Money::ZERO;

    if let Some(claim) = &req.voucher {
        let voucher = claim.voucher;
        voucher.check_claim(claim, req.now)?;
        if let Some(min) = voucher.min_purchase {
            if after_products < min { return Err(VoucherError::MinPurchaseNotMet(min).into()); }
        }
        match &voucher.scope {
            VoucherScope::Total => voucher_discount = voucher.discount_on(after_products),
            VoucherScope::Product { product_id } => {
                let base: Money = lines.iter().filter(|l| l.product_id == *product_id).map(|l| l.net).sum();
                if !lines.iter().any(|l| l.product_id == *product_id) {
                    return Err(VoucherError::ProductNotInCart.into());
                }
                voucher_discount = voucher.discount_on(base);
            }
            VoucherScope::Shipping => shipping_discount = voucher.discount_on(req.shipping_cost),
        }
        voucher_id = Some(voucher.id);
    }

    let total = after_products
        .saturating_sub(voucher_discount)
        + req.shipping_cost.saturating_sub(shipping_discount);

    Ok(PriceBreakdown {
        lines, subtotal, product_discount, voucher_id, voucher_discount,
        shipping_cost: req.shipping_cost, shipping_discount, total,
    })
}

fn price_line(line: &PricingLine, discounts: &[Discount], now: DateTime<Utc>) -> Result<PricedLine, PricingError> {
    if line.quantity == 0 { return Err(PricingError::ZeroQuantity(line.product_id)); }
    if line.unit_price.is_negative() { return Err(PricingError::NegativePrice(line.product_id)); }
    let gross = line.unit_price.times(line.quantity);

    // Best applicable rule wins; the first one listed keeps ties.
    let best = discounts
        .iter()
        .filter(|d| d.product_id == line.product_id)
        .filter_map(|d| d.apply_to_line(line.unit_price, line.quantity, now).map(|ld| (d.id, ld)))
        .fold(None, |best: Option<(Uuid, LineDiscount)>, cand| match best {
            Some(b) if b.1.amount >= cand.1.amount => Some(b),
            _ => Some(cand),
        });

    let (discount_id, discount, free_quantity) = match best {
        Some((id, ld)) => (Some(id), ld.amount.min(gross), ld.free_quantity),
        None => (None, Money::ZERO, 0),
    };

    Ok(PricedLine {
        product_id: line.product_id,
        name: line.name.clone(),
        unit_price: line.unit_price,
        quantity: line.quantity,
        free_quantity,
        discount_id,
        gross,
        discount,
        net: gross.saturating_sub(discount),
    })
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("nothing to price")]
    NoLines,
    #[error("quantity of product {0} must be at least 1")]
    ZeroQuantity(Uuid),
    #[error("price of product {0} is negative")]
    NegativePrice(Uuid),
    #[error(transparent)]
    Voucher(#[from] VoucherError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::discount::DiscountKind;
    use crate::domain::aggregates::voucher::{Voucher, VoucherValue};
    use crate::domain::value_objects::{Code, Percentage};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn line(id: Uuid, price: i64, qty: u32) -> PricingLine {
        PricingLine { product_id: id, name: "item".into(), unit_price: Money::rupiah(price), quantity: qty }
    }

    fn discount(product: Uuid, kind: DiscountKind) -> Discount {
        let now = Utc::now();
        Discount::new(Uuid::nil(), product, kind, None, None, now - Duration::days(1), now + Duration::days(1)).unwrap()
    }

    fn pct(v: i64) -> Percentage { Percentage::new(Decimal::from(v)).unwrap() }

    fn voucher(scope: VoucherScope, value: VoucherValue) -> Voucher {
        let now = Utc::now();
        Voucher::issue(Code::new("PROMO1").unwrap(), scope, value, now - Duration::days(1), now + Duration::days(1)).unwrap()
    }

    fn request<'a>(lines: &'a [PricingLine], discounts: &'a [Discount], voucher: Option<&'a Voucher>, shipping: i64) -> PricingRequest<'a> {
        PricingRequest {
            lines,
            discounts,
            voucher: voucher.map(|v| VoucherClaim { voucher: v, customer_id: Uuid::nil(), store_id: Uuid::nil(), previously_redeemed: false }),
            shipping_cost: Money::rupiah(shipping),
            now: Utc::now(),
        }
    }

    #[test]
    fn test_no_discounts_totals_with_shipping() {
        let lines = [line(Uuid::new_v4(), 10_000, 2), line(Uuid::new_v4(), 5_000, 1)];
        let b = calculate_discount(&request(&lines, &[], None, 12_000)).unwrap();
        assert_eq!(b.subtotal, Money::rupiah(25_000));
        assert_eq!(b.total_discount(), Money::ZERO);
        assert_eq!(b.total, Money::rupiah(37_000));
    }

    #[test]
    fn test_best_discount_wins() {
        let p = Uuid::new_v4();
        let lines = [line(p, 10_000, 4)];
        let small = discount(p, DiscountKind::Nominal { amount: Money::rupiah(1_000) });
        let big = discount(p, DiscountKind::BuyOneGetOne);
        let b = calculate_discount(&request(&lines, &[small, big.clone()], None, 0)).unwrap();
        assert_eq!(b.lines[0].discount_id, Some(big.id));
        assert_eq!(b.lines[0].free_quantity, 2);
        assert_eq!(b.product_discount, Money::rupiah(20_000));
        assert_eq!(b.total, Money::rupiah(20_000));
    }

    #[test]
    fn test_discount_for_other_product_ignored() {
        let lines = [line(Uuid::new_v4(), 10_000, 1)];
        let d = discount(Uuid::new_v4(), DiscountKind::Percentage { percent: pct(50) });
        let b = calculate_discount(&request(&lines, &[d], None, 0)).unwrap();
        assert_eq!(b.product_discount, Money::ZERO);
    }

    #[test]
    fn test_total_voucher_applies_after_product_discounts() {
        let p = Uuid::new_v4();
        let lines = [line(p, 50_000, 2)];
        let d = discount(p, DiscountKind::Percentage { percent: pct(10) });
        let mut v = voucher(VoucherScope::Total, VoucherValue::Percentage { percent: pct(20) });
        v.min_purchase = Some(Money::rupiah(90_000));
        let b = calculate_discount(&request(&lines, &[d], Some(&v), 10_000)).unwrap();
        assert_eq!(b.product_discount, Money::rupiah(10_000));
        assert_eq!(b.voucher_discount, Money::rupiah(18_000));
        assert_eq!(b.voucher_id, Some(v.id));
        assert_eq!(b.total, Money::rupiah(82_000));
    }

    #[test]
    fn test_min_purchase_checked_after_product_discounts() {
        let p = Uuid::new_v4();
        let lines = [line(p, 50_000, 2)];
        let d = discount(p, DiscountKind::Percentage { percent: pct(20) });
        let mut v = voucher(VoucherScope::Total, VoucherValue::Nominal { amount: Money::rupiah(5_000) });
        v.min_purchase = Some(Money::rupiah(90_000));
        let err = calculate_discount(&request(&lines, &[d], Some(&v), 0)).unwrap_err();
        assert_eq!(err, PricingError::Voucher(VoucherError::MinPurchaseNotMet(Money::rupiah(90_000))));
    }

    #[test]
    fn test_product_voucher_limited_to_line() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = [line(a, 8_000, 1), line(b, 100_000, 1)];
        let v = voucher(VoucherScope::Product { product_id: a }, VoucherValue::Nominal { amount: Money::rupiah(10_000) });
        let got = calculate_discount(&request(&lines, &[], Some(&v), 0)).unwrap();
        assert_eq!(got.voucher_discount, Money::rupiah(8_000));

        let missing = voucher(VoucherScope::Product { product_id: Uuid::new_v4() }, VoucherValue::Nominal { amount: Money::rupiah(1) });
        let err = calculate_discount(&request(&lines, &[], Some(&missing), 0)).unwrap_err();
        assert_eq!(err, PricingError::Voucher(VoucherError::ProductNotInCart));
    }

    #[test]
    fn test_shipping_voucher_never_exceeds_shipping() {
        let lines = [line(Uuid::new_v4(), 30_000, 1)];
        let v = voucher(VoucherScope::Shipping, VoucherValue::Nominal { amount: Money::rupiah(20_000) });
        let b = calculate_discount(&request(&lines, &[], Some(&v), 15_000)).unwrap();
        assert_eq!(b.shipping_discount, Money::rupiah(15_000));
        assert_eq!(b.voucher_discount, Money::ZERO);
        assert_eq!(b.total, Money::rupiah(30_000));
    }

    #[test]
    fn test_rejects_empty_and_zero_quantity() {
        assert_eq!(calculate_discount(&request(&[], &[], None, 0)).unwrap_err(), PricingError::NoLines);
        let p = Uuid::new_v4();
        let lines = [line(p, 1_000, 0)];
        assert_eq!(calculate_discount(&request(&lines, &[], None, 0)).unwrap_err(), PricingError::ZeroQuantity(p));
    }

    #[test]
    fn test_voucher_claim_rules_enforced() {
        let lines = [line(Uuid::new_v4(), 30_000, 1)];
        let mut v = voucher(VoucherScope::Total, VoucherValue::Nominal { amount: Money::rupiah(5_000) });
        v.owner_id = Some(Uuid::new_v4());
        let err = calculate_discount(&request(&lines, &[], Some(&v), 0)).unwrap_err();
        assert_eq!(err, PricingError::Voucher(VoucherError::NotOwner));
    }
}
