use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::corrupt;
use crate::domain::aggregates::{StockAdjustment, Store, StoreStock};
use crate::domain::value_objects::GeoPoint;
use crate::Result;

#[derive(Debug, FromRow)]
struct StoreRow {
    id: Uuid,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    service_radius_km: f64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = crate::EcommerceError;
    fn try_from(r: StoreRow) -> Result<Self> {
        Ok(Store {
            id: r.id,
            name: r.name,
            address: r.address,
            location: GeoPoint::new(r.latitude, r.longitude).map_err(corrupt)?,
            service_radius_km: r.service_radius_km,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    store_id: Uuid,
    product_id: Uuid,
    delta: i32,
    quantity_after: i32,
    reason: String,
    order_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for StockAdjustment {
    type Error = crate::EcommerceError;
    fn try_from(r: AdjustmentRow) -> Result<Self> {
        Ok(StockAdjustment {
            id: r.id, store_id: r.store_id, product_id: r.product_id, delta: r.delta,
            quantity_after: r.quantity_after, reason: r.reason.parse()?,
            order_id: r.order_id, actor_id: r.actor_id, note: r.note, created_at: r.created_at,
        })
    }
}

/// Stock line joined with the product name for admin views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

pub async fn insert(conn: &mut PgConnection, s: &Store) -> Result<()> {
    sqlx::query("INSERT INTO stores (id, name, address, latitude, longitude, service_radius_km, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
        .bind(s.id).bind(&s.name).bind(&s.address).bind(s.location.latitude).bind(s.location.longitude)
        .bind(s.service_radius_km).bind(s.is_active).bind(s.created_at)
        .execute(conn).await?;
    Ok(())
}

pub async fn update(conn: &mut PgConnection, s: &Store) -> Result<()> {
    sqlx::query("UPDATE stores SET name = $2, address = $3, latitude = $4, longitude = $5, service_radius_km = $6, is_active = $7 WHERE id = $1")
        .bind(s.id).bind(&s.name).bind(&s.address).bind(s.location.latitude).bind(s.location.longitude)
        .bind(s.service_radius_km).bind(s.is_active)
        .execute(conn).await?;
    Ok(())
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Store>> {
    sqlx::query_as::<_, StoreRow>("SELECT * FROM stores WHERE id = $1")
        .bind(id).fetch_optional(conn).await?
        .map(Store::try_from).transpose()
}

pub async fn list(conn: &mut PgConnection, active_only: bool) -> Result<Vec<Store>> {
    sqlx::query_as::<_, StoreRow>("SELECT * FROM stores WHERE is_active OR NOT $1 ORDER BY name")
        .bind(active_only).fetch_all(conn).await?
        .into_iter().map(Store::try_from).collect()
}

/// Locks stock rows in product order. Products without a row come back as empty stock.
pub async fn lock_stocks(conn: &mut PgConnection, store_id: Uuid, product_ids: &[Uuid]) -> Result<Vec<StoreStock>> {
    let mut ids = product_ids.to_vec();
    ids.sort();
    ids.dedup();
    let rows: Vec<(Uuid, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM store_stocks WHERE store_id = $1 AND product_id = ANY($2) ORDER BY product_id FOR UPDATE",
    )
    .bind(store_id).bind(&ids)
    .fetch_all(conn).await?;
    Ok(ids
        .into_iter()
        .map(|pid| {
            let quantity = rows.iter().find(|(id, _)| *id == pid).map(|(_, q)| *q).unwrap_or(0);
            StoreStock { store_id, product_id: pid, quantity }
        })
        .collect())
}

pub async fn save_stock(conn: &mut PgConnection, stock: &StoreStock) -> Result<()> {
    sqlx::query(
        "INSERT INTO store_stocks (store_id, product_id, quantity, updated_at) VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (store_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()",
    )
    .bind(stock.store_id).bind(stock.product_id).bind(stock.quantity)
    .execute(conn).await?;
    Ok(())
}

pub async fn insert_adjustment(conn: &mut PgConnection, a: &StockAdjustment) -> Result<()> {
    sqlx::query("INSERT INTO stock_adjustments (id, store_id, product_id, delta, quantity_after, reason, order_id, actor_id, note, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
        .bind(a.id).bind(a.store_id).bind(a.product_id).bind(a.delta).bind(a.quantity_after)
        .bind(a.reason.as_str()).bind(a.order_id).bind(a.actor_id).bind(&a.note).bind(a.created_at)
        .execute(conn).await?;
    Ok(())
}

pub async fn list_stock(conn: &mut PgConnection, store_id: Uuid) -> Result<Vec<StockLevel>> {
    let rows = sqlx::query_as::<_, StockLevel>(
        "SELECT s.product_id, p.name AS product_name, s.quantity, s.updated_at FROM store_stocks s \
         JOIN products p ON p.id = s.product_id WHERE s.store_id = $1 ORDER BY p.name",
    )
    .bind(store_id).fetch_all(conn).await?;
    Ok(rows)
}

pub async fn list_adjustments(conn: &mut PgConnection, store_id: Uuid, product_id: Option<Uuid>, limit: i64) -> Result<Vec<StockAdjustment>> {
    sqlx::query_as::<_, AdjustmentRow>(
        "SELECT * FROM stock_adjustments WHERE store_id = $1 AND ($2::uuid IS NULL OR product_id = $2) ORDER BY created_at DESC LIMIT $3",
    )
    .bind(store_id).bind(product_id).bind(limit)
    .fetch_all(conn).await?
    .into_iter().map(StockAdjustment::try_from).collect()
}
