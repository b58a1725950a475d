//! Periodic housekeeping: expire unpaid orders and auto-confirm delivered ones.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::infrastructure::db::orders;
use crate::services::orders::{cancel, confirm_delivery, Access, CancelRequest};
use crate::state::AppState;
use crate::{EcommerceError, Result};

const BATCH_SIZE: i64 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub cancelled: usize,
    pub confirmed: usize,
    pub failed: usize,
}

pub fn spawn(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match sweep_once(&state).await {
                Ok(report) if report == SweepReport::default() => {}
                Ok(report) => tracing::info!(cancelled = report.cancelled, confirmed = report.confirmed, failed = report.failed, "sweep finished"),
                Err(e) => tracing::error!(error = %e, "sweep failed"),
            }
        }
    })
}

pub async fn sweep_once(state: &AppState) -> Result<SweepReport> {
    let now = Utc::now();
    let (overdue, due) = {
        let mut conn = state.db.acquire().await?;
        let overdue = orders::overdue_unpaid(&mut conn, now, BATCH_SIZE).await?;
        let due = orders::shipped_before(&mut conn, now - state.config.auto_confirm_after(), BATCH_SIZE).await?;
        (overdue, due)
    };

    let mut report = SweepReport::default();
    for order_id in overdue {
        match cancel(state, order_id, Access::System, CancelRequest::PaymentExpired).await {
            Ok(_) => report.cancelled += 1,
            // Paid or cancelled between the scan and the lock.
            Err(EcommerceError::Order(_) | EcommerceError::Conflict(_)) => {}
            Err(e) => {
                report.failed += 1;
                tracing::warn!(%order_id, error = %e, "could not expire order");
            }
        }
    }
    for order_id in due {
        match confirm_delivery(state, order_id, Access::System).await {
            Ok(_) => report.confirmed += 1,
            Err(EcommerceError::Order(_) | EcommerceError::Conflict(_)) => {}
            Err(e) => {
                report.failed += 1;
                tracing::warn!(%order_id, error = %e, "could not auto-confirm order");
            }
        }
    }
    Ok(report)
}
