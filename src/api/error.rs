//! HTTP mapping of service errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::aggregates::{OrderError, StockError, VoucherError};
use crate::domain::value_objects::ValueError;
use crate::EcommerceError;

/// Handler error: wraps [`EcommerceError`] and renders `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(pub EcommerceError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<EcommerceError> for ApiError {
    fn from(e: EcommerceError) -> Self { Self(e) }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self { Self(e.into()) }
}

impl From<ValueError> for ApiError {
    fn from(e: ValueError) -> Self { Self(e.into()) }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self { Self(EcommerceError::Validation(r.body_text())) }
}

pub fn status_of(e: &EcommerceError) -> StatusCode {
    use EcommerceError::*;
    match e {
        NotFound(_) => StatusCode::NOT_FOUND,
        Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Forbidden(_) => StatusCode::FORBIDDEN,
        Validation(_) | Value(_) | Product(_) | Store(_) | Discount(_) | User(_) | Referral(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Conflict(_) => StatusCode::CONFLICT,
        Order(OrderError::InvalidTransition { .. } | OrderError::PaymentDeadlinePassed) => StatusCode::CONFLICT,
        Order(OrderError::UnknownValue(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Order(_) => StatusCode::BAD_REQUEST,
        Stock(StockError::InsufficientStock { .. }) => StatusCode::CONFLICT,
        Stock(StockError::UnknownReason(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Stock(_) => StatusCode::BAD_REQUEST,
        Voucher(VoucherError::Exhausted | VoucherError::AlreadyRedeemed) => StatusCode::CONFLICT,
        Voucher(_) | Pricing(_) | Cart(_) => StatusCode::BAD_REQUEST,
        PaymentGateway(_) => StatusCode::BAD_GATEWAY,
        Storage(_) | Database(_) | Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            match status {
                StatusCode::BAD_GATEWAY => "payment gateway unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CartError, OrderStatus};

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(&EcommerceError::NotFound("order")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&EcommerceError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(&EcommerceError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(&EcommerceError::Validation("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(&EcommerceError::from(CartError::Empty)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&EcommerceError::from(VoucherError::Expired)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&EcommerceError::from(VoucherError::Exhausted)), StatusCode::CONFLICT);
        assert_eq!(status_of(&EcommerceError::PaymentGateway("down".into())), StatusCode::BAD_GATEWAY);

        let transition = OrderError::InvalidTransition { from: OrderStatus::Shipped, action: "cancel" };
        assert_eq!(status_of(&EcommerceError::from(transition)), StatusCode::CONFLICT);
        let stock = StockError::InsufficientStock { product_id: uuid::Uuid::nil(), available: 1, requested: 2 };
        assert_eq!(status_of(&EcommerceError::from(stock)), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_internal_errors_are_hidden() {
        let response = ApiError(EcommerceError::Storage("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let response = ApiError(EcommerceError::NotFound("order")).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "order not found");
    }
}
