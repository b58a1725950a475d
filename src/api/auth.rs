use axum::{extract::State, http::StatusCode, Json};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use crate::domain::aggregates::User;
use crate::infrastructure::db::users;
use crate::services::auth::{self, Registration};
use crate::state::AppState;
use crate::EcommerceError;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

pub async fn register(State(s): State<AppState>, ValidJson(r): ValidJson<RegisterRequest>) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = auth::register(&s, Registration { email: r.email, name: r.name, password: r.password, referral_code: r.referral_code }).await?;
    let token = auth::issue_token(&user, &s.config.jwt_secret, Duration::hours(s.config.jwt_ttl_hours))?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user, token })))
}

pub async fn login(State(s): State<AppState>, ValidJson(r): ValidJson<LoginRequest>) -> ApiResult<Json<SessionResponse>> {
    let (user, token) = auth::login(&s, &r.email, &r.password).await?;
    Ok(Json(SessionResponse { user, token }))
}

pub async fn me(State(s): State<AppState>, caller: AuthUser) -> ApiResult<Json<User>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    let user = users::find_by_id(&mut conn, caller.id).await?.ok_or(EcommerceError::NotFound("user"))?;
    Ok(Json(user))
}
