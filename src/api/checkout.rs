use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use crate::domain::aggregates::{PaymentMethod, ShippingAddress};
use crate::domain::value_objects::Code;
use crate::services::checkout::{self, CheckoutInput, PlacedOrder, Quote};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub recipient: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 300))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 3, max = 10))]
    pub postal_code: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub store_id: Option<Uuid>,
    #[validate]
    pub address: AddressRequest,
    pub payment_method: PaymentMethod,
    pub voucher_code: Option<String>,
}

impl CheckoutRequest {
    fn into_input(self) -> ApiResult<CheckoutInput> {
        let a = self.address;
        Ok(CheckoutInput {
            store_id: self.store_id,
            address: ShippingAddress {
                recipient: a.recipient, phone: a.phone, street: a.street, city: a.city,
                postal_code: a.postal_code, latitude: a.latitude, longitude: a.longitude,
            },
            payment_method: self.payment_method,
            voucher_code: self.voucher_code.filter(|c| !c.trim().is_empty()).map(Code::new).transpose()?,
        })
    }
}

pub async fn preview(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<Json<Quote>> {
    Ok(Json(checkout::preview(&s, caller.id, &r.into_input()?).await?))
}

pub async fn place_order(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<PlacedOrder>)> {
    let placed = checkout::place_order(&s, caller.id, r.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
