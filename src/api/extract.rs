//! Request extractors: bearer authentication and validated JSON bodies.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiError;
use crate::domain::aggregates::Role;
use crate::services::auth::verify_token;
use crate::state::AppState;
use crate::EcommerceError;

/// The caller identified by `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_admin_of(&self, store_id: Uuid) -> Result<(), ApiError> {
        if self.role.manages(store_id) { Ok(()) } else { Err(EcommerceError::Forbidden("not an admin of this store".into()).into()) }
    }

    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        match self.role {
            Role::SuperAdmin => Ok(()),
            _ => Err(EcommerceError::Forbidden("super admin access required".into()).into()),
        }
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ").map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or_else(|| EcommerceError::Unauthorized("missing bearer token".into()))?;
        let claims = verify_token(token, &state.config.jwt_secret)?;
        Ok(Self { id: claims.sub, role: claims.role()? })
    }
}

/// JSON body that must pass `validator` rules before reaching the handler.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/api/v1/auth/me");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer(&parts(None)), None);
    }

    #[test]
    fn test_role_guards() {
        let store = Uuid::new_v4();
        let admin = AuthUser { id: Uuid::new_v4(), role: Role::StoreAdmin { store_id: store } };
        assert!(admin.require_admin_of(store).is_ok());
        assert!(admin.require_admin_of(Uuid::new_v4()).is_err());
        assert!(admin.require_super_admin().is_err());
        let root = AuthUser { id: Uuid::new_v4(), role: Role::SuperAdmin };
        assert!(root.require_super_admin().is_ok());
    }
}
