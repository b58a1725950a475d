//! Checkout: store selection, pricing and order placement.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{
    nearest_store, Order, OrderLine, OrderSnapshot, PaymentMethod, ShippingAddress, StockAdjustment, StockError, Store, StoreStock,
    Voucher, VoucherClaim,
};
use crate::domain::pricing::{calculate_discount, PriceBreakdown, PricingRequest};
use crate::domain::value_objects::{Code, GeoPoint};
use crate::infrastructure::db::{carts, orders, promotions, stores};
use crate::infrastructure::midtrans::SnapTransaction;
use crate::state::AppState;
use crate::{EcommerceError, Result};

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub store_id: Option<Uuid>,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub voucher_code: Option<Code>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub store_id: Uuid,
    pub store_name: String,
    pub distance_km: f64,
    pub pricing: PriceBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: OrderSnapshot,
    pub payment: Option<SnapTransaction>,
}

/// Store that will fulfil the order: the requested one if it delivers to `point`, else the nearest.
fn choose_store(requested: Option<Uuid>, point: &GeoPoint, candidates: &[Store]) -> Result<(Store, f64)> {
    match requested {
        Some(id) => {
            let store = candidates.iter().find(|s| s.id == id).ok_or(EcommerceError::NotFound("store"))?;
            if !store.is_active {
                return Err(EcommerceError::Validation(format!("{} is not accepting orders", store.name)));
            }
            if !store.serves(point) {
                return Err(EcommerceError::Validation(format!("{} does not deliver to this address", store.name)));
            }
            Ok((store.clone(), store.location.distance_km(point)))
        }
        None => nearest_store(point, candidates)
            .map(|(s, d)| (s.clone(), d))
            .ok_or_else(|| EcommerceError::Validation("no store delivers to this address".into())),
    }
}

/// Takes every line (paid and free units) from the locked stock rows.
pub fn reserve_stock(stocks: &mut [StoreStock], lines: &[OrderLine], order_id: Uuid) -> std::result::Result<Vec<StockAdjustment>, StockError> {
    let mut adjustments = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(stock) = stocks.iter_mut().find(|s| s.product_id == line.product_id) else {
            return Err(StockError::InsufficientStock { product_id: line.product_id, available: 0, requested: line.quantity });
        };
        adjustments.push(stock.take(line.quantity, order_id)?);
    }
    Ok(adjustments)
}

struct Priced {
    quote: Quote,
    voucher: Option<Voucher>,
}

async fn price(conn: &mut PgConnection, customer_id: Uuid, input: &CheckoutInput, state: &AppState, now: DateTime<Utc>, lock_voucher: bool) -> Result<Priced> {
    let cart = carts::load(&mut *conn, customer_id).await?;
    let lines = cart.pricing_lines()?;
    let point = GeoPoint::new(input.address.latitude, input.address.longitude)?;
    // Inactive stores stay in the list so naming one is a validation error, not a missing store.
    let candidates = stores::list(&mut *conn, false).await?;
    let (store, distance_km) = choose_store(input.store_id, &point, &candidates)?;

    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let discounts = promotions::running_discounts(&mut *conn, store.id, &product_ids, now).await?;

    let (voucher, previously_redeemed) = match &input.voucher_code {
        Some(code) => {
            let v = promotions::find_voucher_by_code(&mut *conn, code, lock_voucher).await?.ok_or(EcommerceError::NotFound("voucher"))?;
            let redeemed = promotions::has_redeemed(&mut *conn, v.id, customer_id).await?;
            (Some(v), redeemed)
        }
        None => (None, false),
    };

    let pricing = calculate_discount(&PricingRequest {
        lines: &lines,
        discounts: &discounts,
        voucher: voucher.as_ref().map(|v| VoucherClaim { voucher: v, customer_id, store_id: store.id, previously_redeemed }),
        shipping_cost: state.config.shipping_cost(distance_km),
        now,
    })?;

    Ok(Priced { quote: Quote { store_id: store.id, store_name: store.name, distance_km, pricing }, voucher })
}

pub async fn preview(state: &AppState, customer_id: Uuid, input: &CheckoutInput) -> Result<Quote> {
    let mut conn = state.db.acquire().await?;
    Ok(price(&mut conn, customer_id, input, state, Utc::now(), false).await?.quote)
}

pub async fn place_order(state: &AppState, customer_id: Uuid, input: CheckoutInput) -> Result<PlacedOrder> {
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let Priced { quote, voucher } = price(&mut tx, customer_id, &input, state, now, true).await?;

    let product_ids: Vec<Uuid> = quote.pricing.lines.iter().map(|l| l.product_id).collect();
    let mut stocks = stores::lock_stocks(&mut tx, quote.store_id, &product_ids).await?;

    let mut order = Order::place(customer_id, quote.store_id, input.payment_method, &quote.pricing, input.address, state.config.payment_window())?;
    let adjustments = reserve_stock(&mut stocks, order.items(), order.id())?;

    orders::insert(&mut tx, order.snapshot()).await?;
    for stock in &stocks {
        stores::save_stock(&mut tx, stock).await?;
    }
    for adjustment in &adjustments {
        stores::insert_adjustment(&mut tx, adjustment).await?;
    }
    if let Some(mut voucher) = voucher {
        voucher.redeem()?;
        promotions::save_voucher_usage(&mut tx, &voucher).await?;
        promotions::insert_redemption(&mut tx, voucher.id, customer_id, order.id()).await?;
    }
    carts::clear(&mut tx, customer_id).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id(), store_id = %quote.store_id, total = %order.total(), "order placed");
    let mut events = order.take_events();
    events.extend(adjustments.iter().flat_map(StockAdjustment::events));
    state.events.publish_all(events).await;

    let snapshot = order.into_snapshot();
    let payment = match (snapshot.payment_method, &state.gateway) {
        (PaymentMethod::Gateway, Some(gateway)) => match gateway.create_transaction(&snapshot).await {
            Ok(tx) => Some(tx),
            Err(e) => {
                tracing::error!(order_id = %snapshot.id, error = %e, "payment gateway transaction failed");
                None
            }
        },
        (PaymentMethod::Gateway, None) => {
            tracing::warn!(order_id = %snapshot.id, "gateway payment requested but no gateway is configured");
            None
        }
        (PaymentMethod::ManualTransfer, _) => None,
    };
    Ok(PlacedOrder { order: snapshot, payment })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;

    fn line(product_id: Uuid, quantity: u32) -> OrderLine {
        OrderLine {
            id: Uuid::new_v4(), product_id, name: "Tomato".into(), unit_price: Money::rupiah(5_000),
            quantity, free_quantity: 0, discount: Money::ZERO, total: Money::rupiah(5_000).times(quantity),
        }
    }

    fn store(name: &str, lat: f64, lon: f64) -> Store {
        Store::open(name, "-", GeoPoint::new(lat, lon).unwrap(), 10.0).unwrap()
    }

    #[test]
    fn test_reserve_stock_all_or_error() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let order = Uuid::new_v4();
        let mut stocks = vec![
            StoreStock { store_id: Uuid::nil(), product_id: a, quantity: 5 },
            StoreStock { store_id: Uuid::nil(), product_id: b, quantity: 1 },
        ];
        let adj = reserve_stock(&mut stocks, &[line(a, 2), line(b, 1)], order).unwrap();
        assert_eq!(adj.len(), 2);
        assert_eq!(stocks[0].quantity, 3);
        assert_eq!(stocks[1].quantity, 0);

        let err = reserve_stock(&mut stocks, &[line(b, 1)], order).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { available: 0, .. }));
        let missing = Uuid::new_v4();
        assert!(reserve_stock(&mut stocks, &[line(missing, 1)], order).is_err());
    }

    #[test]
    fn test_choose_store() {
        let near = store("Near", -6.2000, 106.8000);
        let far = store("Far", -6.2500, 106.8500);
        let candidates = vec![far.clone(), near.clone()];
        let point = GeoPoint::new(-6.2010, 106.8010).unwrap();

        let (picked, _) = choose_store(None, &point, &candidates).unwrap();
        assert_eq!(picked.id, near.id);
        let (picked, d) = choose_store(Some(far.id), &point, &candidates).unwrap();
        assert_eq!(picked.id, far.id);
        assert!(d > 5.0);

        let away = GeoPoint::new(-7.2575, 112.7521).unwrap();
        assert!(matches!(choose_store(None, &away, &candidates), Err(EcommerceError::Validation(_))));
        assert!(matches!(choose_store(Some(Uuid::new_v4()), &point, &candidates), Err(EcommerceError::NotFound("store"))));
    }

    #[test]
    fn test_choose_inactive_store() {
        let mut closed = store("Closed", -6.2000, 106.8000);
        closed.is_active = false;
        let open = store("Open", -6.2100, 106.8100);
        let candidates = vec![closed.clone(), open.clone()];
        let point = GeoPoint::new(-6.2001, 106.8001).unwrap();

        let err = choose_store(Some(closed.id), &point, &candidates).unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(ref m) if m.contains("not accepting orders")));
        let (picked, _) = choose_store(None, &point, &candidates).unwrap();
        assert_eq!(picked.id, open.id);
    }
}
