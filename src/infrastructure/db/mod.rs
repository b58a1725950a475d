//! Postgres repositories.
//!
//! Every function takes a `&mut PgConnection` so the same code runs on a pooled
//! connection or inside a transaction (`&mut *tx`).

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod promotions;
pub mod stores;
pub mod users;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{EcommerceError, Result};

pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| EcommerceError::Storage(e.to_string()))
}

/// Stored value that no longer parses into the domain type.
pub(crate) fn corrupt(e: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::Storage(e.to_string())
}

pub(crate) fn to_u32(v: i32) -> Result<u32> {
    u32::try_from(v).map_err(corrupt)
}

pub(crate) fn to_i32(v: u32) -> Result<i32> {
    i32::try_from(v).map_err(|_| EcommerceError::Validation(format!("{v} is out of range")))
}

/// Maps unique-constraint violations to `Conflict`.
pub(crate) fn conflict_on_unique(what: &str) -> impl Fn(sqlx::Error) -> EcommerceError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => EcommerceError::Conflict(format!("{what} already exists")),
        _ => EcommerceError::Database(e),
    }
}

/// `page` is 1-based; `per_page` is clamped to 1..=100.
#[derive(Clone, Copy, Debug)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page: page.unwrap_or(1).max(1), per_page: per_page.unwrap_or(20).clamp(1, 100) }
    }
    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let p = Page::new(Some(0), Some(500));
        assert_eq!((p.page, p.per_page), (1, 100));
        let p = Page::new(Some(3), None);
        assert_eq!((p.limit(), p.offset()), (20, 40));
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(to_u32(5).unwrap(), 5);
        assert!(to_u32(-1).is_err());
        assert!(to_i32(u32::MAX).is_err());
    }
}
