//! Cart edits. Stock is checked at checkout, not here.

use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem};
use crate::infrastructure::db::{carts, catalog};
use crate::state::AppState;
use crate::{EcommerceError, Result};

pub async fn view(state: &AppState, user_id: Uuid) -> Result<Cart> {
    let mut conn = state.db.acquire().await?;
    carts::load(&mut conn, user_id).await
}

pub async fn add_item(state: &AppState, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
    let mut tx = state.db.begin().await?;
    let product = catalog::find_product(&mut tx, product_id).await?.ok_or(EcommerceError::NotFound("product"))?;
    let mut cart = carts::load(&mut tx, user_id).await?;
    let total = cart.add_item(CartItem {
        product_id,
        name: product.name.clone(),
        unit_price: product.price,
        quantity,
        available: product.is_available(),
    })?;
    carts::save_line(&mut tx, &cart, product_id).await?;
    tx.commit().await?;
    tracing::debug!(%user_id, %product_id, quantity = total, "cart line saved");
    Ok(cart)
}

/// Zero removes the line.
pub async fn set_quantity(state: &AppState, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<Cart> {
    let mut tx = state.db.begin().await?;
    let mut cart = carts::load(&mut tx, user_id).await?;
    cart.update_quantity(product_id, quantity)?;
    carts::save_line(&mut tx, &cart, product_id).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn remove_item(state: &AppState, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
    let mut tx = state.db.begin().await?;
    let mut cart = carts::load(&mut tx, user_id).await?;
    cart.remove_item(product_id)?;
    carts::save_line(&mut tx, &cart, product_id).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn clear(state: &AppState, user_id: Uuid) -> Result<()> {
    let mut conn = state.db.acquire().await?;
    carts::clear(&mut conn, user_id).await
}
