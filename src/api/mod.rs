//! HTTP surface under `/api/v1`.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod extract;
pub mod orders;
pub mod payments;
pub mod stores;
pub mod vouchers;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use crate::infrastructure::uploads::PUBLIC_PREFIX;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

async fn health(State(s): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "freshcart",
        "events": if s.events.is_connected() { "nats" } else { "log" },
        "payment_gateway": s.gateway.is_some(),
    }))
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.uploads.max_bytes() + MULTIPART_OVERHEAD;
    let uploads = ServeDir::new(state.uploads.root());

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route("/products/:id", get(catalog::get_product).put(catalog::update_product).delete(catalog::archive_product))
        .route("/stores", get(stores::list_stores).post(stores::create_store))
        .route("/stores/:id", put(stores::update_store))
        .route("/stores/:id/stock", get(stores::list_stock))
        .route("/stores/:id/stock/adjustments", get(stores::list_adjustments).post(stores::adjust_stock))
        .route("/stores/:id/discounts", get(stores::list_discounts).post(stores::create_discount))
        .route("/discounts/:id", delete(stores::delete_discount))
        .route("/vouchers", get(vouchers::my_vouchers).post(vouchers::create_voucher))
        .route("/cart", get(cart::view).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:product_id", put(cart::set_quantity).delete(cart::remove_item))
        .route("/checkout/preview", post(checkout::preview))
        .route("/checkout", post(checkout::place_order))
        .route("/orders", get(orders::list))
        .route("/orders/:id", get(orders::get))
        .route(
            "/orders/:id/payment-proof",
            post(orders::upload_payment_proof)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(upload_limit)),
        )
        .route("/orders/:id/approve-payment", post(orders::approve_payment))
        .route("/orders/:id/reject-payment", post(orders::reject_payment))
        .route("/orders/:id/ship", post(orders::ship))
        .route("/orders/:id/confirm", post(orders::confirm))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/payments/notification", post(payments::notification));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
