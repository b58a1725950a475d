//! Registration (with referral rewards), login and JWT handling.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Referral, ReferralError, Role, User};
use crate::domain::events::{DomainEvent, ReferralEvent};
use crate::domain::value_objects::Code;
use crate::infrastructure::db::{promotions, users};
use crate::state::AppState;
use crate::{EcommerceError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub store_id: Option<Uuid>,
    pub exp: i64,
}

impl Claims {
    pub fn role(&self) -> Result<Role> {
        Ok(Role::from_parts(&self.role, self.store_id)?)
    }
}

pub fn issue_token(user: &User, secret: &str, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: user.id,
        role: user.role.as_str().to_string(),
        store_id: user.role.store_id(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| EcommerceError::Storage(format!("token encoding failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| EcommerceError::Unauthorized("invalid or expired token".into()))
}

pub fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(EcommerceError::Validation(format!("password must be at least {MIN_PASSWORD_LENGTH} characters")));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EcommerceError::Storage(format!("password hash error: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|_| EcommerceError::Unauthorized("invalid credentials".into()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| EcommerceError::Unauthorized("invalid credentials".into()))
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub referral_code: Option<String>,
}

/// Creates a customer account. A referral code links the new account to its referrer
/// and may earn the referrer a voucher, all in one transaction.
pub async fn register(state: &AppState, input: Registration) -> Result<User> {
    let hash = hash_password(&input.password)?;
    let mut user = User::register(input.email, input.name, hash, Role::Customer);

    let mut tx = state.db.begin().await?;
    let mut events = Vec::new();

    let referrer = match input.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => {
            let code = Code::new(raw).map_err(|_| ReferralError::UnknownCode)?;
            let referrer = users::find_by_referral_code(&mut tx, &code).await?.ok_or(ReferralError::UnknownCode)?;
            user.referred_by = Some(referrer.id);
            Some(referrer)
        }
        None => None,
    };

    users::insert(&mut tx, &user).await?;

    if let Some(referrer) = referrer {
        let referral = Referral::record(referrer.id, user.id)?;
        users::insert_referral(&mut tx, &referral).await?;
        events.push(referral.event());

        let count = users::lock_referral_count(&mut tx, referrer.id).await?;
        if let Some(voucher) = state.config.referral_policy().reward_for(referrer.id, count, Utc::now())? {
            promotions::insert_voucher(&mut tx, &voucher).await?;
            tracing::info!(referrer_id = %referrer.id, voucher_id = %voucher.id, count, "referral reward issued");
            events.push(DomainEvent::Referral(ReferralEvent::Rewarded { referrer_id: referrer.id, voucher_id: voucher.id }));
        }
    }

    tx.commit().await?;
    tracing::info!(user_id = %user.id, referred = user.referred_by.is_some(), "user registered");
    state.events.publish_all(events).await;
    Ok(user)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(User, String)> {
    let mut conn = state.db.acquire().await?;
    let user = users::find_by_email(&mut conn, email)
        .await?
        .ok_or_else(|| EcommerceError::Unauthorized("invalid credentials".into()))?;
    verify_password(password, &user.password_hash)?;
    let token = issue_token(&user, &state.config.jwt_secret, Duration::hours(state.config.jwt_ttl_hours))?;
    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(verify_password("wrong horse", &hash).is_err());
        assert!(matches!(hash_password("short"), Err(EcommerceError::Validation(_))));
    }

    #[test]
    fn test_token_carries_role() {
        let store = Uuid::new_v4();
        let user = User::register("admin@example.com", "Admin", "x".into(), Role::StoreAdmin { store_id: store });
        let token = issue_token(&user, "secret", Duration::hours(1)).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role().unwrap(), Role::StoreAdmin { store_id: store });
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let user = User::register("a@example.com", "A", "x".into(), Role::Customer);
        let token = issue_token(&user, "secret", Duration::hours(-2)).unwrap();
        assert!(matches!(verify_token(&token, "secret"), Err(EcommerceError::Unauthorized(_))));
    }
}
