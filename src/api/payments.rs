use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::error::ApiResult;
use crate::infrastructure::midtrans::Notification;
use crate::services::orders;
use crate::state::AppState;

/// Gateway status callback. Answers 200 once handled so the gateway stops retrying.
pub async fn notification(State(s): State<AppState>, Json(n): Json<Notification>) -> ApiResult<Json<Value>> {
    tracing::info!(order_number = %n.order_id, status = %n.transaction_status, "payment notification received");
    let order = orders::apply_gateway_notification(&s, &n).await?;
    Ok(Json(json!({
        "received": true,
        "order_status": order.map(|o| o.status),
    })))
}
