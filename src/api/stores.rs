use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use crate::domain::aggregates::{AdjustmentReason, Discount, DiscountKind, StockAdjustment, Store};
use crate::domain::value_objects::{GeoPoint, Money};
use crate::infrastructure::db::stores::StockLevel;
use crate::infrastructure::db::{promotions, stores};
use crate::services::catalog::{self as catalog_service, StoreDraft};
use crate::services::inventory::{self, AdjustmentRequest};
use crate::services::promotions::{self as promotions_service, DiscountDraft};
use crate::state::AppState;
use crate::EcommerceError;

pub async fn list_stores(State(s): State<AppState>) -> ApiResult<Json<Vec<Store>>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    Ok(Json(stores::list(&mut conn, true).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StoreRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.1, max = 100.0))]
    pub service_radius_km: f64,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool { true }

impl StoreRequest {
    fn into_draft(self) -> ApiResult<StoreDraft> {
        Ok(StoreDraft {
            location: GeoPoint::new(self.latitude, self.longitude)?,
            name: self.name,
            address: self.address,
            service_radius_km: self.service_radius_km,
            is_active: self.is_active,
        })
    }
}

pub async fn create_store(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<StoreRequest>) -> ApiResult<(StatusCode, Json<Store>)> {
    let store = catalog_service::create_store(&s, &caller.role, r.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn update_store(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<StoreRequest>) -> ApiResult<Json<Store>> {
    Ok(Json(catalog_service::update_store(&s, &caller.role, id, r.into_draft()?).await?))
}

pub async fn list_stock(State(s): State<AppState>, Path(store_id): Path<Uuid>) -> ApiResult<Json<Vec<StockLevel>>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    stores::find(&mut conn, store_id).await?.ok_or(EcommerceError::NotFound("store"))?;
    Ok(Json(stores::list_stock(&mut conn, store_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    #[validate(range(min = -100000, max = 100000))]
    pub delta: i32,
    pub reason: AdjustmentReason,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

pub async fn adjust_stock(State(s): State<AppState>, caller: AuthUser, Path(store_id): Path<Uuid>, ValidJson(r): ValidJson<AdjustStockRequest>) -> ApiResult<(StatusCode, Json<StockAdjustment>)> {
    let request = AdjustmentRequest { product_id: r.product_id, delta: r.delta, reason: r.reason, note: r.note };
    let adjustment = inventory::adjust(&s, caller.id, &caller.role, store_id, request).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentQuery {
    pub product_id: Option<Uuid>,
    pub limit: Option<u32>,
}

pub async fn list_adjustments(State(s): State<AppState>, caller: AuthUser, Path(store_id): Path<Uuid>, Query(q): Query<AdjustmentQuery>) -> ApiResult<Json<Vec<StockAdjustment>>> {
    caller.require_admin_of(store_id)?;
    let limit = i64::from(q.limit.unwrap_or(50).clamp(1, 500));
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    Ok(Json(stores::list_adjustments(&mut conn, store_id, q.product_id, limit).await?))
}

pub async fn list_discounts(State(s): State<AppState>, Path(store_id): Path<Uuid>) -> ApiResult<Json<Vec<Discount>>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    Ok(Json(promotions::list_discounts(&mut conn, store_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DiscountRequest {
    pub product_id: Uuid,
    pub kind: DiscountKind,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

pub async fn create_discount(State(s): State<AppState>, caller: AuthUser, Path(store_id): Path<Uuid>, ValidJson(r): ValidJson<DiscountRequest>) -> ApiResult<(StatusCode, Json<Discount>)> {
    let draft = DiscountDraft {
        product_id: r.product_id,
        kind: r.kind,
        min_purchase: r.min_purchase.map(Money::new),
        max_discount: r.max_discount.map(Money::new),
        starts_at: r.starts_at,
        ends_at: r.ends_at,
    };
    let discount = promotions_service::create_discount(&s, &caller.role, store_id, draft).await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

pub async fn delete_discount(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    promotions_service::deactivate_discount(&s, &caller.role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
