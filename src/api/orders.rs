use axum::{extract::{Multipart, Path, Query, State}, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use super::PaginatedResponse;
use crate::domain::aggregates::{OrderSnapshot, OrderStatus};
use crate::infrastructure::db::Page;
use crate::services::orders::{self, Access, CancelRequest};
use crate::state::AppState;
use crate::EcommerceError;

fn access(caller: &AuthUser) -> Access { Access::for_user(caller.id, caller.role) }

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
    pub store: Option<Uuid>,
}

pub async fn list(State(s): State<AppState>, caller: AuthUser, Query(q): Query<OrderQuery>) -> ApiResult<Json<PaginatedResponse<OrderSnapshot>>> {
    let page = Page::new(q.page, q.per_page);
    let (data, total) = orders::list(&s, access(&caller), q.store, q.status, page).await?;
    Ok(Json(PaginatedResponse { data, total, page: page.page, per_page: page.per_page }))
}

pub async fn get(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSnapshot>> {
    Ok(Json(orders::get(&s, id, access(&caller)).await?))
}

/// Multipart upload; the image is read from the `file` field.
pub async fn upload_payment_proof(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>, mut multipart: Multipart) -> ApiResult<Json<OrderSnapshot>> {
    let bad_form = |e: axum::extract::multipart::MultipartError| EcommerceError::Validation(e.body_text());
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        if field.name() != Some("file") { continue; }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_form)?;
        return Ok(Json(orders::upload_payment_proof(&s, id, access(&caller), &file_name, &bytes).await?));
    }
    Err(EcommerceError::Validation("multipart field 'file' is required".into()).into())
}

pub async fn approve_payment(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSnapshot>> {
    Ok(Json(orders::approve_payment(&s, id, access(&caller)).await?))
}

pub async fn reject_payment(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSnapshot>> {
    Ok(Json(orders::reject_payment(&s, id, access(&caller)).await?))
}

pub async fn ship(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSnapshot>> {
    Ok(Json(orders::ship(&s, id, access(&caller)).await?))
}

pub async fn confirm(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSnapshot>> {
    Ok(Json(orders::confirm_delivery(&s, id, access(&caller)).await?))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBody {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

pub async fn cancel(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>, body: Option<ValidJson<CancelBody>>) -> ApiResult<Json<OrderSnapshot>> {
    let reason = body.and_then(|ValidJson(b)| b.reason).filter(|r| !r.trim().is_empty());
    let request = if caller.role.is_admin() { CancelRequest::Admin { reason } } else { CancelRequest::Customer { reason } };
    Ok(Json(orders::cancel(&s, id, access(&caller), request).await?))
}
