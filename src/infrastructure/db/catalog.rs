use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{conflict_on_unique, Page};
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::Money;
use crate::Result;

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Category { id: r.id, name: r.name, slug: r.slug, description: r.description, created_at: r.created_at }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    price: Decimal,
    weight_grams: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = crate::EcommerceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id,
            category_id: r.category_id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            price: Money::new(r.price),
            weight_grams: r.weight_grams,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductStockRow {
    #[sqlx(flatten)]
    product: ProductRow,
    stock: Option<i32>,
}

/// Product with its stock at the requested store, if one was requested.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub stock: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub store_id: Option<Uuid>,
}

pub async fn insert_category(conn: &mut PgConnection, c: &Category) -> Result<()> {
    sqlx::query("INSERT INTO categories (id, name, slug, description, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(c.id).bind(&c.name).bind(&c.slug).bind(&c.description).bind(c.created_at)
        .execute(conn).await.map_err(conflict_on_unique("category"))?;
    Ok(())
}

pub async fn list_categories(conn: &mut PgConnection) -> Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name").fetch_all(conn).await?;
    Ok(rows.into_iter().map(Category::from).collect())
}

pub async fn category_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(id).fetch_one(conn).await?;
    Ok(exists)
}

pub async fn insert_product(conn: &mut PgConnection, p: &Product) -> Result<()> {
    sqlx::query("INSERT INTO products (id, category_id, name, slug, description, price, weight_grams, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
        .bind(p.id).bind(p.category_id).bind(&p.name).bind(&p.slug).bind(&p.description)
        .bind(p.price.amount()).bind(p.weight_grams).bind(p.status.as_str()).bind(p.created_at).bind(p.updated_at)
        .execute(conn).await?;
    Ok(())
}

pub async fn update_product(conn: &mut PgConnection, p: &Product) -> Result<()> {
    sqlx::query("UPDATE products SET category_id = $2, name = $3, slug = $4, description = $5, price = $6, weight_grams = $7, status = $8, updated_at = $9 WHERE id = $1")
        .bind(p.id).bind(p.category_id).bind(&p.name).bind(&p.slug).bind(&p.description)
        .bind(p.price.amount()).bind(p.weight_grams).bind(p.status.as_str()).bind(p.updated_at)
        .execute(conn).await?;
    Ok(())
}

pub async fn find_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id).fetch_optional(conn).await?
        .map(Product::try_from).transpose()
}

pub async fn list_products(conn: &mut PgConnection, filter: &ProductFilter, page: Page) -> Result<(Vec<ProductListing>, i64)> {
    const WHERE: &str = "p.status = 'active' \
        AND ($1::uuid IS NULL OR p.category_id = $1) \
        AND ($2::text IS NULL OR p.name ILIKE '%' || $2 || '%')";
    let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let rows = sqlx::query_as::<_, ProductStockRow>(&format!(
        "SELECT p.*, s.quantity AS stock FROM products p \
         LEFT JOIN store_stocks s ON s.product_id = p.id AND s.store_id = $3 \
         WHERE {WHERE} ORDER BY p.name LIMIT $4 OFFSET $5"
    ))
    .bind(filter.category_id).bind(search).bind(filter.store_id).bind(page.limit()).bind(page.offset())
    .fetch_all(&mut *conn).await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products p WHERE {WHERE}"))
        .bind(filter.category_id).bind(search)
        .fetch_one(&mut *conn).await?;
    let listings = rows
        .into_iter()
        .map(|r| Ok(ProductListing { stock: r.stock, product: Product::try_from(r.product)? }))
        .collect::<Result<Vec<_>>>()?;
    Ok((listings, total))
}
