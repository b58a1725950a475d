use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{to_i32, to_u32};
use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::value_objects::Money;
use crate::Result;

#[derive(Debug, FromRow)]
struct CartItemRow {
    product_id: Uuid,
    name: String,
    price: Decimal,
    quantity: i32,
    status: String,
}

pub async fn load(conn: &mut PgConnection, user_id: Uuid) -> Result<Cart> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT c.product_id, p.name, p.price, c.quantity, p.status FROM cart_items c \
         JOIN products p ON p.id = c.product_id WHERE c.user_id = $1 ORDER BY c.created_at",
    )
    .bind(user_id).fetch_all(conn).await?;
    let items = rows
        .into_iter()
        .map(|r| Ok(CartItem {
            product_id: r.product_id,
            name: r.name,
            unit_price: Money::new(r.price),
            quantity: to_u32(r.quantity)?,
            available: r.status == "active",
        }))
        .collect::<Result<Vec<_>>>()?;
    Ok(Cart::with_items(user_id, items))
}

/// Writes the line for `product_id` as it stands in `cart`, deleting it when absent.
pub async fn save_line(conn: &mut PgConnection, cart: &Cart, product_id: Uuid) -> Result<()> {
    match cart.items().iter().find(|i| i.product_id == product_id) {
        Some(item) => {
            sqlx::query(
                "INSERT INTO cart_items (id, user_id, product_id, quantity, created_at) VALUES ($1, $2, $3, $4, NOW()) \
                 ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
            )
            .bind(Uuid::now_v7()).bind(cart.user_id()).bind(product_id).bind(to_i32(item.quantity)?)
            .execute(conn).await?;
        }
        None => {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(cart.user_id()).bind(product_id)
                .execute(conn).await?;
        }
    }
    Ok(())
}

pub async fn clear(conn: &mut PgConnection, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(())
}
