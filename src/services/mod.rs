//! Application services: each operation owns its transaction and publishes events after commit.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod promotions;
pub mod sweeper;
