//! Order lifecycle transitions, each run in its own transaction with the order row locked.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{
    CancelActor, Order, OrderError, OrderSnapshot, OrderStatus, PaymentMethod, Role, StockAdjustment, StockRelease, Voucher,
};
use crate::domain::events::DomainEvent;
use crate::infrastructure::db::orders::OrderScope;
use crate::infrastructure::db::{orders, promotions, stores, Page};
use crate::infrastructure::midtrans::{Notification, PaymentOutcome};
use crate::state::AppState;
use crate::{EcommerceError, Result};

/// Who is acting on an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Owner(Uuid),
    Admin(Role),
    System,
}

impl Access {
    pub fn for_user(user_id: Uuid, role: Role) -> Self {
        if role.is_admin() { Self::Admin(role) } else { Self::Owner(user_id) }
    }

    pub fn can_view(&self, order: &OrderSnapshot) -> bool {
        match self {
            Self::Owner(user_id) => order.user_id == *user_id,
            Self::Admin(role) => role.manages(order.store_id),
            Self::System => true,
        }
    }

    fn require_owner(&self, order: &OrderSnapshot) -> Result<()> {
        match self {
            Self::Owner(user_id) if order.user_id == *user_id => Ok(()),
            _ => Err(EcommerceError::Forbidden("only the customer who placed the order may do this".into())),
        }
    }

    fn require_admin(&self, order: &OrderSnapshot) -> Result<()> {
        match self {
            Self::Admin(role) if role.manages(order.store_id) => Ok(()),
            _ => Err(EcommerceError::Forbidden("store admin access required".into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelRequest {
    Customer { reason: Option<String> },
    Admin { reason: Option<String> },
    PaymentExpired,
    GatewayFailed { reason: String },
}

/// Loads the order for the caller, hiding orders they may not see.
pub async fn get(state: &AppState, order_id: Uuid, access: Access) -> Result<OrderSnapshot> {
    let mut conn = state.db.acquire().await?;
    let order = orders::find(&mut conn, order_id).await?.ok_or(EcommerceError::NotFound("order"))?;
    if !access.can_view(&order) {
        return Err(EcommerceError::NotFound("order"));
    }
    Ok(order)
}

/// Listing scope for the caller. Store admins only see their store; super admins may filter by store.
pub fn list_scope(access: Access, store_filter: Option<Uuid>) -> Result<OrderScope> {
    match access {
        Access::Owner(user_id) => Ok(OrderScope::Customer(user_id)),
        Access::Admin(Role::StoreAdmin { store_id }) => match store_filter {
            Some(other) if other != store_id => Err(EcommerceError::Forbidden("not an admin of this store".into())),
            _ => Ok(OrderScope::Store(store_id)),
        },
        Access::Admin(_) | Access::System => Ok(store_filter.map_or(OrderScope::All, OrderScope::Store)),
    }
}

pub async fn list(state: &AppState, access: Access, store_filter: Option<Uuid>, status: Option<OrderStatus>, page: Page) -> Result<(Vec<OrderSnapshot>, i64)> {
    let scope = list_scope(access, store_filter)?;
    let mut conn = state.db.acquire().await?;
    orders::list(&mut conn, scope, status, page).await
}

async fn load_locked(conn: &mut PgConnection, order_id: Uuid, access: Access) -> Result<Order> {
    let snapshot = orders::find_for_update(conn, order_id).await?.ok_or(EcommerceError::NotFound("order"))?;
    if !access.can_view(&snapshot) {
        return Err(EcommerceError::NotFound("order"));
    }
    Ok(Order::from(snapshot))
}

async fn mutate<F>(state: &AppState, order_id: Uuid, access: Access, f: F) -> Result<OrderSnapshot>
where
    F: FnOnce(&mut Order, Access, DateTime<Utc>) -> Result<()>,
{
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let mut order = load_locked(&mut tx, order_id, access).await?;
    f(&mut order, access, now)?;
    orders::update_lifecycle(&mut tx, order.snapshot()).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id(), status = order.status().as_str(), "order updated");
    state.events.publish_all(order.take_events()).await;
    Ok(order.into_snapshot())
}

pub async fn upload_payment_proof(state: &AppState, order_id: Uuid, access: Access, file_name: &str, bytes: &[u8]) -> Result<OrderSnapshot> {
    // Reject before writing anything to disk.
    state.uploads.check(file_name, bytes.len())?;
    let current = get(state, order_id, access).await?;
    access.require_owner(&current)?;
    Order::from(current).accepts_payment_proof(Utc::now())?;

    let url = state.uploads.save_payment_proof(order_id, file_name, bytes).await?;
    let result = mutate(state, order_id, access, |order, access, now| {
        access.require_owner(order.snapshot())?;
        Ok(order.attach_payment_proof(url.clone(), now)?)
    })
    .await;
    if result.is_err() {
        if let Err(e) = state.uploads.remove(&url).await {
            tracing::warn!(%order_id, %url, error = %e, "failed to remove rejected payment proof");
        }
    }
    result
}

pub async fn approve_payment(state: &AppState, order_id: Uuid, access: Access) -> Result<OrderSnapshot> {
    mutate(state, order_id, access, |order, access, now| {
        access.require_admin(order.snapshot())?;
        Ok(order.approve_payment(now)?)
    })
    .await
}

/// Sends the order back to awaiting payment with a fresh deadline.
pub async fn reject_payment(state: &AppState, order_id: Uuid, access: Access) -> Result<OrderSnapshot> {
    let window = state.config.payment_window();
    mutate(state, order_id, access, |order, access, now| {
        access.require_admin(order.snapshot())?;
        Ok(order.reject_payment(now + window, now)?)
    })
    .await
}

pub async fn ship(state: &AppState, order_id: Uuid, access: Access) -> Result<OrderSnapshot> {
    mutate(state, order_id, access, |order, access, now| {
        access.require_admin(order.snapshot())?;
        Ok(order.ship(now)?)
    })
    .await
}

/// Customer confirmation, or the sweeper once the auto-confirm period has passed.
pub async fn confirm_delivery(state: &AppState, order_id: Uuid, access: Access) -> Result<OrderSnapshot> {
    let after = state.config.auto_confirm_after();
    mutate(state, order_id, access, |order, access, now| {
        match access {
            Access::System if !order.is_auto_confirm_due(after, now) => {
                return Err(EcommerceError::Conflict("auto-confirmation is not due yet".into()));
            }
            Access::System => {}
            _ => access.require_owner(order.snapshot())?,
        }
        Ok(order.confirm_delivery(now)?)
    })
    .await
}

/// Cancels the order, puts its stock back and frees its voucher use.
pub async fn cancel(state: &AppState, order_id: Uuid, access: Access, request: CancelRequest) -> Result<OrderSnapshot> {
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let mut order = load_locked(&mut tx, order_id, access).await?;

    let (actor, reason) = match request {
        CancelRequest::Customer { reason } => {
            access.require_owner(order.snapshot())?;
            (CancelActor::Customer, reason.unwrap_or_else(|| "cancelled by customer".into()))
        }
        CancelRequest::Admin { reason } => {
            access.require_admin(order.snapshot())?;
            (CancelActor::Admin, reason.unwrap_or_else(|| "cancelled by store".into()))
        }
        CancelRequest::PaymentExpired => {
            if !order.is_payment_overdue(now) {
                return Err(EcommerceError::Conflict("payment deadline has not passed".into()));
            }
            (CancelActor::System, "payment deadline exceeded".to_string())
        }
        CancelRequest::GatewayFailed { reason } => {
            if order.payment_method() != PaymentMethod::Gateway {
                return Err(OrderError::WrongPaymentMethod { required: PaymentMethod::Gateway }.into());
            }
            (CancelActor::System, reason)
        }
    };

    let releases = order.cancel(actor, reason, now)?;
    // Same lock order as checkout: voucher row before stock rows.
    let voucher = match order.voucher_id() {
        Some(voucher_id) => lock_voucher(&mut tx, voucher_id, order.id()).await?,
        None => None,
    };
    let adjustments = restore_stock(&mut tx, order.store_id(), order.id(), &releases).await?;
    if let Some(mut voucher) = voucher {
        voucher.release();
        promotions::save_voucher_usage(&mut tx, &voucher).await?;
        promotions::delete_redemption(&mut tx, voucher.id, order.id()).await?;
    }
    orders::update_lifecycle(&mut tx, order.snapshot()).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order.id(), ?actor, restored = adjustments.len(), "order cancelled");
    let mut events: Vec<DomainEvent> = order.take_events();
    events.extend(adjustments.iter().flat_map(StockAdjustment::events));
    state.events.publish_all(events).await;
    Ok(order.into_snapshot())
}

async fn restore_stock(conn: &mut PgConnection, store_id: Uuid, order_id: Uuid, releases: &[StockRelease]) -> Result<Vec<StockAdjustment>> {
    let ids: Vec<Uuid> = releases.iter().map(|r| r.product_id).collect();
    let mut stocks = stores::lock_stocks(&mut *conn, store_id, &ids).await?;
    let mut adjustments = Vec::with_capacity(releases.len());
    for release in releases.iter().filter(|r| r.quantity > 0) {
        let Some(stock) = stocks.iter_mut().find(|s| s.product_id == release.product_id) else { continue };
        let adjustment = stock.restore(release.quantity, order_id)?;
        stores::save_stock(&mut *conn, stock).await?;
        stores::insert_adjustment(&mut *conn, &adjustment).await?;
        adjustments.push(adjustment);
    }
    Ok(adjustments)
}

async fn lock_voucher(conn: &mut PgConnection, voucher_id: Uuid, order_id: Uuid) -> Result<Option<Voucher>> {
    let voucher = promotions::find_voucher_for_update(conn, voucher_id).await?;
    if voucher.is_none() {
        tracing::warn!(%voucher_id, %order_id, "voucher of cancelled order no longer exists");
    }
    Ok(voucher)
}

/// Applies a verified gateway notification. Returns the order's state after handling.
pub async fn apply_gateway_notification(state: &AppState, notification: &Notification) -> Result<Option<OrderSnapshot>> {
    let gateway = state.gateway.as_ref().ok_or_else(|| EcommerceError::PaymentGateway("payment gateway is not configured".into()))?;
    gateway.verify(notification)?;

    let order_id = {
        let mut conn = state.db.acquire().await?;
        orders::find_id_by_number(&mut conn, &notification.order_id).await?.ok_or(EcommerceError::NotFound("order"))?
    };

    let result = match notification.outcome() {
        PaymentOutcome::Settled { reference } => {
            mutate(state, order_id, Access::System, |order, _, now| {
                if !order.record_gateway_payment(reference, now)? {
                    tracing::debug!(order_id = %order.id(), "duplicate settlement notification");
                }
                Ok(())
            })
            .await
        }
        PaymentOutcome::Failed { reason } => cancel(state, order_id, Access::System, CancelRequest::GatewayFailed { reason }).await,
        PaymentOutcome::Pending => {
            tracing::debug!(%order_id, status = %notification.transaction_status, "payment still pending");
            return Ok(None);
        }
        PaymentOutcome::Ignored => {
            tracing::warn!(
                %order_id,
                status = %notification.transaction_status,
                fraud_status = ?notification.fraud_status,
                "unhandled gateway notification status"
            );
            return Ok(None);
        }
    };

    match result {
        Ok(order) => Ok(Some(order)),
        // The gateway retries until acknowledged; a late notification for a settled order is acknowledged.
        Err(EcommerceError::Order(e @ (OrderError::InvalidTransition { .. } | OrderError::WrongPaymentMethod { .. }))) => {
            tracing::warn!(%order_id, error = %e, status = %notification.transaction_status, "notification does not apply to current order state");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ShippingAddress;
    use crate::domain::value_objects::Money;

    fn snapshot(user_id: Uuid, store_id: Uuid) -> OrderSnapshot {
        let now = Utc::now();
        OrderSnapshot {
            id: Uuid::new_v4(), order_number: "ORD-20240101-ABCDEF".into(), user_id, store_id,
            status: OrderStatus::AwaitingPayment, payment_method: PaymentMethod::ManualTransfer,
            subtotal: Money::rupiah(10_000), product_discount: Money::ZERO, voucher_discount: Money::ZERO,
            shipping_cost: Money::ZERO, shipping_discount: Money::ZERO, total: Money::rupiah(10_000), voucher_id: None,
            shipping_address: ShippingAddress {
                recipient: "Budi".into(), phone: "0812".into(), street: "Jl. Sudirman 1".into(), city: "Jakarta".into(),
                postal_code: "10220".into(), latitude: -6.2, longitude: 106.8,
            },
            payment_proof_url: None, payment_reference: None, payment_deadline: now, paid_at: None, shipped_at: None,
            delivered_at: None, cancelled_at: None, cancel_reason: None, created_at: now, updated_at: now, items: vec![],
        }
    }

    #[test]
    fn test_access_visibility() {
        let (customer, store) = (Uuid::new_v4(), Uuid::new_v4());
        let order = snapshot(customer, store);

        assert!(Access::Owner(customer).can_view(&order));
        assert!(!Access::Owner(Uuid::new_v4()).can_view(&order));
        assert!(Access::Admin(Role::StoreAdmin { store_id: store }).can_view(&order));
        assert!(!Access::Admin(Role::StoreAdmin { store_id: Uuid::new_v4() }).can_view(&order));
        assert!(Access::Admin(Role::SuperAdmin).can_view(&order));
        assert!(Access::System.can_view(&order));
    }

    #[test]
    fn test_owner_and_admin_guards() {
        let (customer, store) = (Uuid::new_v4(), Uuid::new_v4());
        let order = snapshot(customer, store);

        assert!(Access::Owner(customer).require_owner(&order).is_ok());
        assert!(matches!(Access::Admin(Role::SuperAdmin).require_owner(&order), Err(EcommerceError::Forbidden(_))));
        assert!(Access::Admin(Role::StoreAdmin { store_id: store }).require_admin(&order).is_ok());
        assert!(Access::Owner(customer).require_admin(&order).is_err());
        assert!(Access::System.require_admin(&order).is_err());
    }

    #[test]
    fn test_access_for_user() {
        let id = Uuid::new_v4();
        assert_eq!(Access::for_user(id, Role::Customer), Access::Owner(id));
        assert_eq!(Access::for_user(id, Role::SuperAdmin), Access::Admin(Role::SuperAdmin));
    }

    #[test]
    fn test_list_scope() {
        let (user, store) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(list_scope(Access::Owner(user), None), Ok(OrderScope::Customer(id)) if id == user));
        let admin = Access::Admin(Role::StoreAdmin { store_id: store });
        assert!(matches!(list_scope(admin, None), Ok(OrderScope::Store(id)) if id == store));
        assert!(matches!(list_scope(admin, Some(Uuid::new_v4())), Err(EcommerceError::Forbidden(_))));
        assert!(matches!(list_scope(Access::Admin(Role::SuperAdmin), None), Ok(OrderScope::All)));
        assert!(matches!(list_scope(Access::Admin(Role::SuperAdmin), Some(store)), Ok(OrderScope::Store(id)) if id == store));
    }
}
