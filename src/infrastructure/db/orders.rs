use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{to_i32, to_u32, Page};
use crate::domain::aggregates::{OrderLine, OrderSnapshot, OrderStatus, ShippingAddress};
use crate::domain::value_objects::Money;
use crate::Result;

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    store_id: Uuid,
    status: String,
    payment_method: String,
    subtotal: Decimal,
    product_discount: Decimal,
    voucher_discount: Decimal,
    shipping_cost: Decimal,
    shipping_discount: Decimal,
    total: Decimal,
    voucher_id: Option<Uuid>,
    shipping_address: Json<ShippingAddress>,
    payment_proof_url: Option<String>,
    payment_reference: Option<String>,
    payment_deadline: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    free_quantity: i32,
    discount: Decimal,
    total: Decimal,
}

impl TryFrom<OrderItemRow> for OrderLine {
    type Error = crate::EcommerceError;
    fn try_from(r: OrderItemRow) -> Result<Self> {
        Ok(OrderLine {
            id: r.id, product_id: r.product_id, name: r.name, unit_price: Money::new(r.unit_price),
            quantity: to_u32(r.quantity)?, free_quantity: to_u32(r.free_quantity)?,
            discount: Money::new(r.discount), total: Money::new(r.total),
        })
    }
}

impl OrderRow {
    fn into_snapshot(self, items: Vec<OrderLine>) -> Result<OrderSnapshot> {
        Ok(OrderSnapshot {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            store_id: self.store_id,
            status: self.status.parse()?,
            payment_method: self.payment_method.parse()?,
            subtotal: Money::new(self.subtotal),
            product_discount: Money::new(self.product_discount),
            voucher_discount: Money::new(self.voucher_discount),
            shipping_cost: Money::new(self.shipping_cost),
            shipping_discount: Money::new(self.shipping_discount),
            total: Money::new(self.total),
            voucher_id: self.voucher_id,
            shipping_address: self.shipping_address.0,
            payment_proof_url: self.payment_proof_url,
            payment_reference: self.payment_reference,
            payment_deadline: self.payment_deadline,
            paid_at: self.paid_at,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
            cancel_reason: self.cancel_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

pub async fn insert(conn: &mut PgConnection, o: &OrderSnapshot) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, store_id, status, payment_method, subtotal, product_discount, \
         voucher_discount, shipping_cost, shipping_discount, total, voucher_id, shipping_address, payment_deadline, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(o.id).bind(&o.order_number).bind(o.user_id).bind(o.store_id).bind(o.status.as_str()).bind(o.payment_method.as_str())
    .bind(o.subtotal.amount()).bind(o.product_discount.amount()).bind(o.voucher_discount.amount())
    .bind(o.shipping_cost.amount()).bind(o.shipping_discount.amount()).bind(o.total.amount())
    .bind(o.voucher_id).bind(Json(&o.shipping_address)).bind(o.payment_deadline).bind(o.created_at).bind(o.updated_at)
    .execute(&mut *conn).await?;

    for item in &o.items {
        sqlx::query("INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity, free_quantity, discount, total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(item.id).bind(o.id).bind(item.product_id).bind(&item.name).bind(item.unit_price.amount())
            .bind(to_i32(item.quantity)?).bind(to_i32(item.free_quantity)?)
            .bind(item.discount.amount()).bind(item.total.amount())
            .execute(&mut *conn).await?;
    }
    Ok(())
}

/// Persists the mutable lifecycle columns.
pub async fn update_lifecycle(conn: &mut PgConnection, o: &OrderSnapshot) -> Result<()> {
    sqlx::query(
        "UPDATE orders SET status = $2, payment_proof_url = $3, payment_reference = $4, payment_deadline = $5, \
         paid_at = $6, shipped_at = $7, delivered_at = $8, cancelled_at = $9, cancel_reason = $10, updated_at = $11 WHERE id = $1",
    )
    .bind(o.id).bind(o.status.as_str()).bind(&o.payment_proof_url).bind(&o.payment_reference).bind(o.payment_deadline)
    .bind(o.paid_at).bind(o.shipped_at).bind(o.delivered_at).bind(o.cancelled_at).bind(&o.cancel_reason).bind(o.updated_at)
    .execute(conn).await?;
    Ok(())
}

async fn items_for(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderLine>> {
    sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY name")
        .bind(order_id).fetch_all(conn).await?
        .into_iter().map(OrderLine::try_from).collect()
}

async fn find_with(conn: &mut PgConnection, sql: &str, id: Uuid) -> Result<Option<OrderSnapshot>> {
    let Some(row) = sqlx::query_as::<_, OrderRow>(sql).bind(id).fetch_optional(&mut *conn).await? else {
        return Ok(None);
    };
    let items = items_for(conn, row.id).await?;
    row.into_snapshot(items).map(Some)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderSnapshot>> {
    find_with(conn, "SELECT * FROM orders WHERE id = $1", id).await
}

pub async fn find_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderSnapshot>> {
    find_with(conn, "SELECT * FROM orders WHERE id = $1 FOR UPDATE", id).await
}

pub async fn find_id_by_number(conn: &mut PgConnection, order_number: &str) -> Result<Option<Uuid>> {
    let id: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE order_number = $1")
        .bind(order_number).fetch_optional(conn).await?;
    Ok(id.map(|(id,)| id))
}

/// Who the listing is for: a customer's own orders or the orders of a store.
#[derive(Clone, Copy, Debug)]
pub enum OrderScope {
    Customer(Uuid),
    Store(Uuid),
    All,
}

pub async fn list(conn: &mut PgConnection, scope: OrderScope, status: Option<OrderStatus>, page: Page) -> Result<(Vec<OrderSnapshot>, i64)> {
    let (user_id, store_id) = match scope {
        OrderScope::Customer(id) => (Some(id), None),
        OrderScope::Store(id) => (None, Some(id)),
        OrderScope::All => (None, None),
    };
    const WHERE: &str = "($1::uuid IS NULL OR user_id = $1) AND ($2::uuid IS NULL OR store_id = $2) AND ($3::text IS NULL OR status = $3)";
    let status = status.map(|s| s.as_str());
    let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT * FROM orders WHERE {WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"))
        .bind(user_id).bind(store_id).bind(status).bind(page.limit()).bind(page.offset())
        .fetch_all(&mut *conn).await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM orders WHERE {WHERE}"))
        .bind(user_id).bind(store_id).bind(status)
        .fetch_one(&mut *conn).await?;
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = items_for(&mut *conn, row.id).await?;
        orders.push(row.into_snapshot(items)?);
    }
    Ok((orders, total))
}

pub async fn overdue_unpaid(conn: &mut PgConnection, now: DateTime<Utc>, limit: i64) -> Result<Vec<Uuid>> {
    let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE status = 'awaiting_payment' AND payment_deadline < $1 ORDER BY payment_deadline LIMIT $2")
        .bind(now).bind(limit).fetch_all(conn).await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

pub async fn shipped_before(conn: &mut PgConnection, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Uuid>> {
    let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE status = 'shipped' AND shipped_at <= $1 ORDER BY shipped_at LIMIT $2")
        .bind(cutoff).bind(limit).fetch_all(conn).await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}
