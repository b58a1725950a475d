//! End-to-end order flow over the pure domain API.

use chrono::{Duration, Utc};
use uuid::Uuid;

use freshcart::domain::aggregates::{
    CancelActor, Cart, CartItem, Discount, DiscountKind, Order, OrderStatus, PaymentMethod, ShippingAddress, StoreStock, Voucher,
    VoucherClaim, VoucherScope, VoucherValue,
};
use freshcart::domain::events::{DomainEvent, OrderEvent};
use freshcart::domain::pricing::{calculate_discount, PricingRequest};
use freshcart::domain::value_objects::{Code, Money, Percentage};
use freshcart::services::checkout::reserve_stock;
use rust_decimal::Decimal;

fn address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Siti".into(), phone: "081234567890".into(), street: "Jl. Kemang Raya 5".into(),
        city: "Jakarta".into(), postal_code: "12730".into(), latitude: -6.26, longitude: 106.81,
    }
}

fn item(product_id: Uuid, name: &str, price: i64, quantity: u32) -> CartItem {
    CartItem { product_id, name: name.into(), unit_price: Money::rupiah(price), quantity, available: true }
}

#[test]
fn test_cart_to_delivered_order() {
    let (customer, store) = (Uuid::new_v4(), Uuid::new_v4());
    let (rice, eggs) = (Uuid::new_v4(), Uuid::new_v4());
    let now = Utc::now();

    let mut cart = Cart::new(customer);
    cart.add_item(item(rice, "Rice 5kg", 70_000, 1)).unwrap();
    cart.add_item(item(eggs, "Eggs 10pcs", 25_000, 2)).unwrap();
    cart.add_item(item(eggs, "Eggs 10pcs", 25_000, 2)).unwrap();
    assert_eq!(cart.item_count(), 5);

    let discounts = vec![
        Discount::new(store, eggs, DiscountKind::BuyOneGetOne, None, None, now - Duration::days(1), now + Duration::days(1)).unwrap(),
        Discount::new(
            store, rice, DiscountKind::Percentage { percent: Percentage::new(Decimal::from(10)).unwrap() },
            None, None, now - Duration::days(1), now + Duration::days(1),
        ).unwrap(),
    ];
    let voucher = Voucher::issue(
        Code::new("ONGKIR").unwrap(), VoucherScope::Shipping, VoucherValue::Nominal { amount: Money::rupiah(5_000) },
        now - Duration::days(1), now + Duration::days(1),
    ).unwrap();

    let lines = cart.pricing_lines().unwrap();
    let pricing = calculate_discount(&PricingRequest {
        lines: &lines,
        discounts: &discounts,
        voucher: Some(VoucherClaim { voucher: &voucher, customer_id: customer, store_id: store, previously_redeemed: false }),
        shipping_cost: Money::rupiah(14_000),
        now,
    })
    .unwrap();

    // rice 70k - 7k, eggs 4 x 25k with two free
    assert_eq!(pricing.subtotal, Money::rupiah(170_000));
    assert_eq!(pricing.product_discount, Money::rupiah(57_000));
    assert_eq!(pricing.shipping_discount, Money::rupiah(5_000));
    assert_eq!(pricing.total, Money::rupiah(122_000));

    let mut order = Order::place(customer, store, PaymentMethod::ManualTransfer, &pricing, address(), Duration::hours(1)).unwrap();
    let mut stocks = vec![
        StoreStock { store_id: store, product_id: rice, quantity: 3 },
        StoreStock { store_id: store, product_id: eggs, quantity: 4 },
    ];
    let sales = reserve_stock(&mut stocks, order.items(), order.id()).unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(stocks.iter().map(|s| s.quantity).collect::<Vec<_>>(), vec![2, 0]);
    assert!(sales.iter().flat_map(|a| a.events()).any(|e| matches!(e, DomainEvent::Stock(_))));

    let t = Utc::now();
    order.attach_payment_proof("/uploads/payment-proofs/x.jpg".into(), t).unwrap();
    order.approve_payment(t).unwrap();
    order.ship(t).unwrap();
    assert!(order.is_auto_confirm_due(Duration::days(7), t + Duration::days(7)));
    order.confirm_delivery(t).unwrap();
    assert_eq!(order.status(), OrderStatus::Delivered);

    let names: Vec<_> = order
        .take_events()
        .into_iter()
        .filter_map(|e| match e { DomainEvent::Order(e) => Some(e), _ => None })
        .map(|e| match e {
            OrderEvent::Placed { .. } => "placed",
            OrderEvent::ProofUploaded { .. } => "proof",
            OrderEvent::Paid { .. } => "paid",
            OrderEvent::Shipped { .. } => "shipped",
            OrderEvent::Delivered { .. } => "delivered",
            _ => "other",
        })
        .collect();
    assert_eq!(names, ["placed", "proof", "paid", "shipped", "delivered"]);
}

#[test]
fn test_expired_order_returns_stock() {
    let (customer, store, product) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut cart = Cart::new(customer);
    cart.add_item(item(product, "Milk 1L", 18_000, 3)).unwrap();
    let lines = cart.pricing_lines().unwrap();
    let pricing = calculate_discount(&PricingRequest { lines: &lines, discounts: &[], voucher: None, shipping_cost: Money::ZERO, now: Utc::now() }).unwrap();

    let mut order = Order::place(customer, store, PaymentMethod::Gateway, &pricing, address(), Duration::minutes(-1)).unwrap();
    let mut stocks = vec![StoreStock { store_id: store, product_id: product, quantity: 3 }];
    reserve_stock(&mut stocks, order.items(), order.id()).unwrap();
    assert_eq!(stocks[0].quantity, 0);

    let now = Utc::now();
    assert!(order.is_payment_overdue(now));
    let releases = order.cancel(CancelActor::System, "payment deadline exceeded", now).unwrap();
    for release in &releases {
        let stock = stocks.iter_mut().find(|s| s.product_id == release.product_id).unwrap();
        stock.restore(release.quantity, order.id()).unwrap();
    }
    assert_eq!(stocks[0].quantity, 3);
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert!(order.cancel(CancelActor::Admin, "again", now).is_err());
}

#[test]
fn test_insufficient_stock_blocks_reservation() {
    let (customer, store, product) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut cart = Cart::new(customer);
    cart.add_item(item(product, "Apples", 30_000, 5)).unwrap();
    let lines = cart.pricing_lines().unwrap();
    let pricing = calculate_discount(&PricingRequest { lines: &lines, discounts: &[], voucher: None, shipping_cost: Money::ZERO, now: Utc::now() }).unwrap();
    let order = Order::place(customer, store, PaymentMethod::Gateway, &pricing, address(), Duration::hours(1)).unwrap();

    let mut stocks = vec![StoreStock { store_id: store, product_id: product, quantity: 4 }];
    assert!(reserve_stock(&mut stocks, order.items(), order.id()).is_err());
    assert_eq!(stocks[0].quantity, 4);
}
