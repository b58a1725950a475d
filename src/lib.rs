//! FreshCart grocery commerce platform
//!
//! Multi-tenant grocery backend: every store keeps its own stock, customers
//! order from the store that serves their address.
//!
//! ## Features
//! - Catalog (categories, products) and per-store inventory with an adjustment journal
//! - Cart, checkout and order lifecycle (gateway or manual transfer payment)
//! - Discount, voucher and referral pricing engine
//! - Payment gateway notifications and payment proof uploads

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod state;

use thiserror::Error;

use crate::domain::aggregates::{
    CartError, DiscountError, OrderError, ProductError, ReferralError, StockError, StoreError, UserError, VoucherError,
};
use crate::domain::pricing::PricingError;
use crate::domain::value_objects::ValueError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Voucher(#[from] VoucherError),

    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Discount(#[from] DiscountError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
