use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use crate::domain::aggregates::{Voucher, VoucherScope, VoucherValue};
use crate::domain::value_objects::{Code, Money};
use crate::services::promotions::{self, VoucherDraft};
use crate::state::AppState;

pub async fn my_vouchers(State(s): State<AppState>, caller: AuthUser) -> ApiResult<Json<Vec<Voucher>>> {
    Ok(Json(promotions::vouchers_for(&s, caller.id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoucherRequest {
    #[validate(length(min = 4, max = 32))]
    pub code: Option<String>,
    pub scope: VoucherScope,
    pub value: VoucherValue,
    pub max_discount: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    pub owner_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<u32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_voucher(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<VoucherRequest>) -> ApiResult<(StatusCode, Json<Voucher>)> {
    let draft = VoucherDraft {
        code: r.code.map(Code::new).transpose()?,
        scope: r.scope,
        value: r.value,
        max_discount: r.max_discount.map(Money::new),
        min_purchase: r.min_purchase.map(Money::new),
        owner_id: r.owner_id,
        store_id: r.store_id,
        usage_limit: r.usage_limit,
        starts_at: r.starts_at.unwrap_or_else(Utc::now),
        expires_at: r.expires_at,
    };
    let voucher = promotions::create_voucher(&s, &caller.role, draft).await?;
    Ok((StatusCode::CREATED, Json(voucher)))
}
