use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{conflict_on_unique, corrupt};
use crate::domain::aggregates::{Referral, ReferralError, Role, User};
use crate::domain::value_objects::Code;
use crate::{EcommerceError, Result};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    store_id: Option<Uuid>,
    referral_code: String,
    referred_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = crate::EcommerceError;
    fn try_from(r: UserRow) -> Result<Self> {
        Ok(User {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            role: Role::from_parts(&r.role, r.store_id)?,
            referral_code: Code::new(r.referral_code).map_err(corrupt)?,
            referred_by: r.referred_by,
            created_at: r.created_at,
        })
    }
}

pub async fn insert(conn: &mut PgConnection, user: &User) -> Result<()> {
    sqlx::query("INSERT INTO users (id, email, name, password_hash, role, store_id, referral_code, referred_by, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
        .bind(user.id).bind(&user.email).bind(&user.name).bind(&user.password_hash)
        .bind(user.role.as_str()).bind(user.role.store_id()).bind(user.referral_code.as_str())
        .bind(user.referred_by).bind(user.created_at)
        .execute(conn).await.map_err(conflict_on_unique("account"))?;
    Ok(())
}

pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id).fetch_optional(conn).await?
        .map(User::try_from).transpose()
}

pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(email.trim().to_lowercase()).fetch_optional(conn).await?
        .map(User::try_from).transpose()
}

pub async fn find_by_referral_code(conn: &mut PgConnection, code: &Code) -> Result<Option<User>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE referral_code = $1")
        .bind(code.as_str()).fetch_optional(conn).await?
        .map(User::try_from).transpose()
}

pub async fn insert_referral(conn: &mut PgConnection, referral: &Referral) -> Result<()> {
    sqlx::query("INSERT INTO referrals (id, referrer_id, referee_id, created_at) VALUES ($1, $2, $3, $4)")
        .bind(referral.id).bind(referral.referrer_id).bind(referral.referee_id).bind(referral.created_at)
        .execute(conn).await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ReferralError::AlreadyReferred.into(),
            _ => EcommerceError::Database(e),
        })?;
    Ok(())
}

/// Referral count of `referrer_id`, taken under a row lock on the referrer so concurrent sign-ups count sequentially.
pub async fn lock_referral_count(conn: &mut PgConnection, referrer_id: Uuid) -> Result<u32> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE").bind(referrer_id).execute(&mut *conn).await?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM referrals WHERE referrer_id = $1")
        .bind(referrer_id).fetch_one(&mut *conn).await?;
    u32::try_from(count).map_err(corrupt)
}
