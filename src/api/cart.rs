use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::value_objects::Money;
use crate::services::cart;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: Money,
}

impl From<Cart> for CartResponse {
    fn from(c: Cart) -> Self {
        Self { item_count: c.item_count(), subtotal: c.subtotal(), items: c.items().to_vec() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityRequest {
    #[validate(range(max = 999))]
    pub quantity: u32,
}

pub async fn view(State(s): State<AppState>, caller: AuthUser) -> ApiResult<Json<CartResponse>> {
    Ok(Json(cart::view(&s, caller.id).await?.into()))
}

pub async fn add_item(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<AddItemRequest>) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    let cart = cart::add_item(&s, caller.id, r.product_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

pub async fn set_quantity(State(s): State<AppState>, caller: AuthUser, Path(product_id): Path<Uuid>, ValidJson(r): ValidJson<SetQuantityRequest>) -> ApiResult<Json<CartResponse>> {
    Ok(Json(cart::set_quantity(&s, caller.id, product_id, r.quantity).await?.into()))
}

pub async fn remove_item(State(s): State<AppState>, caller: AuthUser, Path(product_id): Path<Uuid>) -> ApiResult<Json<CartResponse>> {
    Ok(Json(cart::remove_item(&s, caller.id, product_id).await?.into()))
}

pub async fn clear(State(s): State<AppState>, caller: AuthUser) -> ApiResult<StatusCode> {
    cart::clear(&s, caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
