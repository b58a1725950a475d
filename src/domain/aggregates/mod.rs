//! Aggregates module
pub mod cart;
pub mod discount;
pub mod order;
pub mod product;
pub mod referral;
pub mod stock;
pub mod store;
pub mod user;
pub mod voucher;

pub use cart::{Cart, CartError, CartItem};
pub use discount::{Discount, DiscountError, DiscountKind};
pub use order::{CancelActor, Order, OrderError, OrderLine, OrderSnapshot, OrderStatus, PaymentMethod, ShippingAddress, StockRelease};
pub use product::{Category, Product, ProductDraft, ProductError, ProductStatus};
pub use referral::{Referral, ReferralError, ReferralPolicy};
pub use stock::{AdjustmentContext, AdjustmentReason, StockAdjustment, StockError, StoreStock};
pub use store::{nearest_store, Store, StoreError};
pub use user::{Role, User, UserError};
pub use voucher::{Voucher, VoucherClaim, VoucherError, VoucherScope, VoucherValue};
