use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{conflict_on_unique, corrupt, to_i32, to_u32};
use crate::domain::aggregates::{Discount, DiscountError, DiscountKind, Voucher, VoucherError, VoucherScope, VoucherValue};
use crate::domain::value_objects::{Code, Money, Percentage};
use crate::{EcommerceError, Result};

#[derive(Debug, FromRow)]
struct DiscountRow {
    id: Uuid,
    store_id: Uuid,
    product_id: Uuid,
    kind: String,
    value: Option<Decimal>,
    min_purchase: Option<Decimal>,
    max_discount: Option<Decimal>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    is_active: bool,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = EcommerceError;
    fn try_from(r: DiscountRow) -> Result<Self> {
        let value = || r.value.ok_or_else(|| corrupt(format!("discount {} has no value", r.id)));
        let kind = match r.kind.as_str() {
            "percentage" => DiscountKind::Percentage { percent: Percentage::new(value()?).map_err(corrupt)? },
            "nominal" => DiscountKind::Nominal { amount: Money::new(value()?) },
            "buy_one_get_one" => DiscountKind::BuyOneGetOne,
            other => return Err(DiscountError::UnknownKind(other.to_string()).into()),
        };
        Ok(Discount {
            id: r.id, store_id: r.store_id, product_id: r.product_id, kind,
            min_purchase: r.min_purchase.map(Money::new), max_discount: r.max_discount.map(Money::new),
            starts_at: r.starts_at, ends_at: r.ends_at, is_active: r.is_active,
        })
    }
}

fn discount_value(kind: &DiscountKind) -> Option<Decimal> {
    match kind {
        DiscountKind::Percentage { percent } => Some(percent.value()),
        DiscountKind::Nominal { amount } => Some(amount.amount()),
        DiscountKind::BuyOneGetOne => None,
    }
}

pub async fn insert_discount(conn: &mut PgConnection, d: &Discount) -> Result<()> {
    sqlx::query("INSERT INTO discounts (id, store_id, product_id, kind, value, min_purchase, max_discount, starts_at, ends_at, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
        .bind(d.id).bind(d.store_id).bind(d.product_id).bind(d.kind.as_str()).bind(discount_value(&d.kind))
        .bind(d.min_purchase.map(|m| m.amount())).bind(d.max_discount.map(|m| m.amount()))
        .bind(d.starts_at).bind(d.ends_at).bind(d.is_active)
        .execute(conn).await?;
    Ok(())
}

pub async fn find_discount(conn: &mut PgConnection, id: Uuid) -> Result<Option<Discount>> {
    sqlx::query_as::<_, DiscountRow>("SELECT * FROM discounts WHERE id = $1")
        .bind(id).fetch_optional(conn).await?
        .map(Discount::try_from).transpose()
}

pub async fn deactivate_discount(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE discounts SET is_active = FALSE WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}

pub async fn list_discounts(conn: &mut PgConnection, store_id: Uuid) -> Result<Vec<Discount>> {
    sqlx::query_as::<_, DiscountRow>("SELECT * FROM discounts WHERE store_id = $1 AND is_active ORDER BY starts_at DESC")
        .bind(store_id).fetch_all(conn).await?
        .into_iter().map(Discount::try_from).collect()
}

/// Discounts of `store_id` for `product_ids` that are running at `now`, oldest first.
pub async fn running_discounts(conn: &mut PgConnection, store_id: Uuid, product_ids: &[Uuid], now: DateTime<Utc>) -> Result<Vec<Discount>> {
    sqlx::query_as::<_, DiscountRow>(
        "SELECT * FROM discounts WHERE store_id = $1 AND product_id = ANY($2) AND is_active \
         AND starts_at <= $3 AND ends_at >= $3 ORDER BY created_at",
    )
    .bind(store_id).bind(product_ids).bind(now)
    .fetch_all(conn).await?
    .into_iter().map(Discount::try_from).collect()
}

#[derive(Debug, FromRow)]
struct VoucherRow {
    id: Uuid,
    code: String,
    scope: String,
    product_id: Option<Uuid>,
    value_kind: String,
    value: Decimal,
    max_discount: Option<Decimal>,
    min_purchase: Option<Decimal>,
    owner_id: Option<Uuid>,
    store_id: Option<Uuid>,
    usage_limit: Option<i32>,
    used_count: i32,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = EcommerceError;
    fn try_from(r: VoucherRow) -> Result<Self> {
        let scope = match (r.scope.as_str(), r.product_id) {
            ("total", _) => VoucherScope::Total,
            ("shipping", _) => VoucherScope::Shipping,
            ("product", Some(product_id)) => VoucherScope::Product { product_id },
            (other, _) => return Err(corrupt(format!("voucher {} has invalid scope {other:?}", r.id))),
        };
        let value = match r.value_kind.as_str() {
            "percentage" => VoucherValue::Percentage { percent: Percentage::new(r.value).map_err(corrupt)? },
            "nominal" => VoucherValue::Nominal { amount: Money::new(r.value) },
            other => return Err(corrupt(format!("voucher {} has invalid value kind {other:?}", r.id))),
        };
        Ok(Voucher {
            id: r.id,
            code: Code::new(r.code).map_err(corrupt)?,
            scope,
            value,
            max_discount: r.max_discount.map(Money::new),
            min_purchase: r.min_purchase.map(Money::new),
            owner_id: r.owner_id,
            store_id: r.store_id,
            usage_limit: r.usage_limit.map(to_u32).transpose()?,
            used_count: to_u32(r.used_count)?,
            starts_at: r.starts_at,
            expires_at: r.expires_at,
        })
    }
}

pub async fn insert_voucher(conn: &mut PgConnection, v: &Voucher) -> Result<()> {
    let product_id = match &v.scope { VoucherScope::Product { product_id } => Some(*product_id), _ => None };
    let (value_kind, value) = match &v.value {
        VoucherValue::Percentage { percent } => ("percentage", percent.value()),
        VoucherValue::Nominal { amount } => ("nominal", amount.amount()),
    };
    sqlx::query("INSERT INTO vouchers (id, code, scope, product_id, value_kind, value, max_discount, min_purchase, owner_id, store_id, usage_limit, used_count, starts_at, expires_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)")
        .bind(v.id).bind(v.code.as_str()).bind(v.scope.as_str()).bind(product_id).bind(value_kind).bind(value)
        .bind(v.max_discount.map(|m| m.amount())).bind(v.min_purchase.map(|m| m.amount()))
        .bind(v.owner_id).bind(v.store_id).bind(v.usage_limit.map(to_i32).transpose()?).bind(to_i32(v.used_count)?)
        .bind(v.starts_at).bind(v.expires_at)
        .execute(conn).await.map_err(conflict_on_unique("voucher code"))?;
    Ok(())
}

pub async fn find_voucher_by_code(conn: &mut PgConnection, code: &Code, for_update: bool) -> Result<Option<Voucher>> {
    let sql = if for_update { "SELECT * FROM vouchers WHERE code = $1 FOR UPDATE" } else { "SELECT * FROM vouchers WHERE code = $1" };
    sqlx::query_as::<_, VoucherRow>(sql)
        .bind(code.as_str()).fetch_optional(conn).await?
        .map(Voucher::try_from).transpose()
}

pub async fn find_voucher_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<Voucher>> {
    sqlx::query_as::<_, VoucherRow>("SELECT * FROM vouchers WHERE id = $1 FOR UPDATE")
        .bind(id).fetch_optional(conn).await?
        .map(Voucher::try_from).transpose()
}

pub async fn save_voucher_usage(conn: &mut PgConnection, v: &Voucher) -> Result<()> {
    sqlx::query("UPDATE vouchers SET used_count = $2 WHERE id = $1")
        .bind(v.id).bind(to_i32(v.used_count)?)
        .execute(conn).await?;
    Ok(())
}

/// Vouchers the user can see: their own plus public ones, unexpired.
pub async fn list_vouchers_for(conn: &mut PgConnection, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Voucher>> {
    sqlx::query_as::<_, VoucherRow>(
        "SELECT * FROM vouchers WHERE (owner_id = $1 OR owner_id IS NULL) AND expires_at >= $2 \
         AND (usage_limit IS NULL OR used_count < usage_limit) ORDER BY expires_at",
    )
    .bind(user_id).bind(now)
    .fetch_all(conn).await?
    .into_iter().map(Voucher::try_from).collect()
}

pub async fn has_redeemed(conn: &mut PgConnection, voucher_id: Uuid, user_id: Uuid) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM voucher_redemptions WHERE voucher_id = $1 AND user_id = $2)")
        .bind(voucher_id).bind(user_id).fetch_one(conn).await?;
    Ok(exists)
}

pub async fn insert_redemption(conn: &mut PgConnection, voucher_id: Uuid, user_id: Uuid, order_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO voucher_redemptions (voucher_id, user_id, order_id) VALUES ($1, $2, $3)")
        .bind(voucher_id).bind(user_id).bind(order_id)
        .execute(conn).await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => VoucherError::AlreadyRedeemed.into(),
            _ => EcommerceError::Database(e),
        })?;
    Ok(())
}

pub async fn delete_redemption(conn: &mut PgConnection, voucher_id: Uuid, order_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM voucher_redemptions WHERE voucher_id = $1 AND order_id = $2")
        .bind(voucher_id).bind(order_id)
        .execute(conn).await?;
    Ok(())
}
