use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::{AuthUser, ValidJson};
use super::PaginatedResponse;
use crate::domain::aggregates::{Category, Product, ProductDraft};
use crate::domain::value_objects::Money;
use crate::infrastructure::db::{catalog, Page};
use crate::infrastructure::db::catalog::{ProductFilter, ProductListing};
use crate::services::catalog as service;
use crate::state::AppState;
use crate::EcommerceError;

pub async fn list_categories(State(s): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    Ok(Json(catalog::list_categories(&mut conn).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_category(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<CreateCategoryRequest>) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = service::create_category(&s, &caller.role, r.name, r.description).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub store: Option<Uuid>,
}

pub async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> ApiResult<Json<PaginatedResponse<ProductListing>>> {
    let page = Page::new(q.page, q.per_page);
    let filter = ProductFilter { category_id: q.category, search: q.search.filter(|t| !t.trim().is_empty()), store_id: q.store };
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    let (data, total) = catalog::list_products(&mut conn, &filter, page).await?;
    Ok(Json(PaginatedResponse { data, total, page: page.page, per_page: page.per_page }))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    let mut conn = s.db.acquire().await.map_err(EcommerceError::from)?;
    let product = catalog::find_product(&mut conn, id).await?.ok_or(EcommerceError::NotFound("product"))?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub weight_grams: i32,
}

impl From<ProductRequest> for ProductDraft {
    fn from(r: ProductRequest) -> Self {
        ProductDraft { category_id: r.category_id, name: r.name, description: r.description, price: Money::new(r.price), weight_grams: r.weight_grams }
    }
}

pub async fn create_product(State(s): State<AppState>, caller: AuthUser, ValidJson(r): ValidJson<ProductRequest>) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = service::create_product(&s, &caller.role, r.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<ProductRequest>) -> ApiResult<Json<Product>> {
    Ok(Json(service::update_product(&s, &caller.role, id, r.into()).await?))
}

pub async fn archive_product(State(s): State<AppState>, caller: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(service::archive_product(&s, &caller.role, id).await?))
}
