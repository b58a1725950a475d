//! Catalog and store administration (super admin only).

use uuid::Uuid;

use crate::domain::aggregates::{Category, Product, ProductDraft, Role, Store};
use crate::domain::value_objects::GeoPoint;
use crate::infrastructure::db::{catalog, stores};
use crate::state::AppState;
use crate::{EcommerceError, Result};

pub fn ensure_super_admin(role: &Role) -> Result<()> {
    match role {
        Role::SuperAdmin => Ok(()),
        _ => Err(EcommerceError::Forbidden("super admin access required".into())),
    }
}

pub async fn create_category(state: &AppState, role: &Role, name: String, description: Option<String>) -> Result<Category> {
    ensure_super_admin(role)?;
    let category = Category::create(name, description)?;
    let mut conn = state.db.acquire().await?;
    catalog::insert_category(&mut conn, &category).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok(category)
}

pub async fn create_product(state: &AppState, role: &Role, draft: ProductDraft) -> Result<Product> {
    ensure_super_admin(role)?;
    let product = Product::create(draft)?;
    let mut conn = state.db.acquire().await?;
    if !catalog::category_exists(&mut conn, product.category_id).await? {
        return Err(EcommerceError::NotFound("category"));
    }
    catalog::insert_product(&mut conn, &product).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok(product)
}

pub async fn update_product(state: &AppState, role: &Role, product_id: Uuid, draft: ProductDraft) -> Result<Product> {
    ensure_super_admin(role)?;
    let mut tx = state.db.begin().await?;
    let mut product = catalog::find_product(&mut tx, product_id).await?.ok_or(EcommerceError::NotFound("product"))?;
    if !catalog::category_exists(&mut tx, draft.category_id).await? {
        return Err(EcommerceError::NotFound("category"));
    }
    product.update(draft)?;
    catalog::update_product(&mut tx, &product).await?;
    tx.commit().await?;
    Ok(product)
}

/// Archived products stay on past orders but can no longer be bought.
pub async fn archive_product(state: &AppState, role: &Role, product_id: Uuid) -> Result<Product> {
    ensure_super_admin(role)?;
    let mut tx = state.db.begin().await?;
    let mut product = catalog::find_product(&mut tx, product_id).await?.ok_or(EcommerceError::NotFound("product"))?;
    product.archive();
    catalog::update_product(&mut tx, &product).await?;
    tx.commit().await?;
    tracing::info!(%product_id, "product archived");
    Ok(product)
}

#[derive(Debug, Clone)]
pub struct StoreDraft {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub service_radius_km: f64,
    pub is_active: bool,
}

pub async fn create_store(state: &AppState, role: &Role, draft: StoreDraft) -> Result<Store> {
    ensure_super_admin(role)?;
    let mut store = Store::open(draft.name, draft.address, draft.location, draft.service_radius_km)?;
    store.is_active = draft.is_active;
    let mut conn = state.db.acquire().await?;
    stores::insert(&mut conn, &store).await?;
    tracing::info!(store_id = %store.id, name = %store.name, "store opened");
    Ok(store)
}

pub async fn update_store(state: &AppState, role: &Role, store_id: Uuid, draft: StoreDraft) -> Result<Store> {
    ensure_super_admin(role)?;
    let mut tx = state.db.begin().await?;
    let existing = stores::find(&mut tx, store_id).await?.ok_or(EcommerceError::NotFound("store"))?;
    let mut store = Store::open(draft.name, draft.address, draft.location, draft.service_radius_km)?;
    store.id = existing.id;
    store.created_at = existing.created_at;
    store.is_active = draft.is_active;
    stores::update(&mut tx, &store).await?;
    tx.commit().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_guard() {
        assert!(ensure_super_admin(&Role::SuperAdmin).is_ok());
        assert!(matches!(ensure_super_admin(&Role::Customer), Err(EcommerceError::Forbidden(_))));
        assert!(ensure_super_admin(&Role::StoreAdmin { store_id: Uuid::new_v4() }).is_err());
    }
}
