//! Store discounts and vouchers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::{Discount, DiscountKind, Role, Voucher, VoucherScope, VoucherValue};
use crate::domain::value_objects::{Code, Money};
use crate::infrastructure::db::{catalog, promotions, stores};
use crate::services::catalog::ensure_super_admin;
use crate::services::inventory::ensure_manages;
use crate::state::AppState;
use crate::{EcommerceError, Result};

#[derive(Debug, Clone)]
pub struct DiscountDraft {
    pub product_id: Uuid,
    pub kind: DiscountKind,
    pub min_purchase: Option<Money>,
    pub max_discount: Option<Money>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

pub async fn create_discount(state: &AppState, role: &Role, store_id: Uuid, draft: DiscountDraft) -> Result<Discount> {
    ensure_manages(role, store_id)?;
    let discount = Discount::new(store_id, draft.product_id, draft.kind, draft.min_purchase, draft.max_discount, draft.starts_at, draft.ends_at)?;
    let mut conn = state.db.acquire().await?;
    stores::find(&mut conn, store_id).await?.ok_or(EcommerceError::NotFound("store"))?;
    catalog::find_product(&mut conn, draft.product_id).await?.ok_or(EcommerceError::NotFound("product"))?;
    promotions::insert_discount(&mut conn, &discount).await?;
    tracing::info!(discount_id = %discount.id, %store_id, kind = discount.kind.as_str(), "discount created");
    Ok(discount)
}

pub async fn deactivate_discount(state: &AppState, role: &Role, discount_id: Uuid) -> Result<()> {
    let mut conn = state.db.acquire().await?;
    let discount = promotions::find_discount(&mut conn, discount_id).await?.ok_or(EcommerceError::NotFound("discount"))?;
    ensure_manages(role, discount.store_id)?;
    promotions::deactivate_discount(&mut conn, discount_id).await?;
    tracing::info!(%discount_id, store_id = %discount.store_id, "discount deactivated");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct VoucherDraft {
    pub code: Option<Code>,
    pub scope: VoucherScope,
    pub value: VoucherValue,
    pub max_discount: Option<Money>,
    pub min_purchase: Option<Money>,
    pub owner_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub usage_limit: Option<u32>,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Builds the voucher; a missing code is generated.
pub fn build_voucher(draft: VoucherDraft) -> Result<Voucher> {
    if draft.usage_limit == Some(0) {
        return Err(EcommerceError::Validation("usage limit must be at least 1".into()));
    }
    let code = draft.code.unwrap_or_else(|| Code::generate("VC"));
    let mut voucher = Voucher::issue(code, draft.scope, draft.value, draft.starts_at, draft.expires_at)?;
    voucher.max_discount = draft.max_discount;
    voucher.min_purchase = draft.min_purchase;
    voucher.owner_id = draft.owner_id;
    voucher.store_id = draft.store_id;
    voucher.usage_limit = draft.usage_limit;
    Ok(voucher)
}

pub async fn create_voucher(state: &AppState, role: &Role, draft: VoucherDraft) -> Result<Voucher> {
    ensure_super_admin(role)?;
    let voucher = build_voucher(draft)?;
    let mut conn = state.db.acquire().await?;
    if let VoucherScope::Product { product_id } = &voucher.scope {
        catalog::find_product(&mut conn, *product_id).await?.ok_or(EcommerceError::NotFound("product"))?;
    }
    promotions::insert_voucher(&mut conn, &voucher).await?;
    tracing::info!(voucher_id = %voucher.id, code = voucher.code.as_str(), "voucher issued");
    Ok(voucher)
}

pub async fn vouchers_for(state: &AppState, user_id: Uuid) -> Result<Vec<Voucher>> {
    let mut conn = state.db.acquire().await?;
    promotions::list_vouchers_for(&mut conn, user_id, Utc::now()).await
}
