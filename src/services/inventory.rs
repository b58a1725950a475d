//! Manual stock adjustments by store staff.

use uuid::Uuid;

use crate::domain::aggregates::{AdjustmentContext, AdjustmentReason, Role, StockAdjustment};
use crate::infrastructure::db::{catalog, stores};
use crate::state::AppState;
use crate::{EcommerceError, Result};

#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub product_id: Uuid,
    pub delta: i32,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
}

pub fn ensure_manages(role: &Role, store_id: Uuid) -> Result<()> {
    if role.manages(store_id) { Ok(()) } else { Err(EcommerceError::Forbidden("not an admin of this store".into())) }
}

/// Sales and cancellations are journaled by checkout and cancellation only.
fn ensure_manual_reason(reason: AdjustmentReason) -> Result<()> {
    match reason {
        AdjustmentReason::Restock | AdjustmentReason::Manual => Ok(()),
        other => Err(EcommerceError::Validation(format!("reason '{}' is reserved for order processing", other.as_str()))),
    }
}

pub async fn adjust(state: &AppState, actor_id: Uuid, role: &Role, store_id: Uuid, req: AdjustmentRequest) -> Result<StockAdjustment> {
    ensure_manages(role, store_id)?;
    ensure_manual_reason(req.reason)?;

    let mut tx = state.db.begin().await?;
    stores::find(&mut tx, store_id).await?.ok_or(EcommerceError::NotFound("store"))?;
    catalog::find_product(&mut tx, req.product_id).await?.ok_or(EcommerceError::NotFound("product"))?;

    let mut stocks = stores::lock_stocks(&mut tx, store_id, &[req.product_id]).await?;
    let stock = stocks.first_mut().ok_or(EcommerceError::NotFound("stock"))?;
    let ctx = AdjustmentContext { order_id: None, actor_id: Some(actor_id), note: req.note };
    let adjustment = stock.apply(req.delta, req.reason, ctx)?;
    stores::save_stock(&mut tx, stock).await?;
    stores::insert_adjustment(&mut tx, &adjustment).await?;
    tx.commit().await?;

    tracing::info!(%store_id, product_id = %req.product_id, delta = req.delta, quantity = adjustment.quantity_after, "stock adjusted");
    state.events.publish_all(adjustment.events()).await;
    Ok(adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_manual_reasons_accepted() {
        assert!(ensure_manual_reason(AdjustmentReason::Restock).is_ok());
        assert!(ensure_manual_reason(AdjustmentReason::Manual).is_ok());
        assert!(matches!(ensure_manual_reason(AdjustmentReason::Sale), Err(EcommerceError::Validation(_))));
        assert!(ensure_manual_reason(AdjustmentReason::Cancellation).is_err());
    }

    #[test]
    fn test_store_scoping() {
        let store = Uuid::new_v4();
        assert!(ensure_manages(&Role::StoreAdmin { store_id: store }, store).is_ok());
        assert!(ensure_manages(&Role::SuperAdmin, store).is_ok());
        assert!(matches!(ensure_manages(&Role::StoreAdmin { store_id: Uuid::new_v4() }, store), Err(EcommerceError::Forbidden(_))));
        assert!(ensure_manages(&Role::Customer, store).is_err());
    }
}
