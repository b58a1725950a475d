//! Catalog: products and categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: Option<String>) -> Result<Self, ProductError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        Ok(Self { id: Uuid::now_v7(), slug: slugify(&name), name, description, created_at: Utc::now() })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub weight_grams: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Active, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Archived => "archived" }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(ProductError::UnknownStatus(other.to_string())),
        }
    }
}

/// Editable product fields.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub weight_grams: i32,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), category_id: draft.category_id, name: String::new(), slug: String::new(),
            description: None, price: Money::ZERO, weight_grams: 0, status: ProductStatus::Active,
            created_at: now, updated_at: now,
        };
        product.update(draft)?;
        Ok(product)
    }

    pub fn update(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        if draft.price.is_zero() || draft.price.is_negative() { return Err(ProductError::InvalidPrice); }
        if draft.weight_grams < 0 { return Err(ProductError::InvalidWeight); }
        self.category_id = draft.category_id;
        self.slug = slugify(&name);
        self.name = name;
        self.description = draft.description;
        self.price = draft.price;
        self.weight_grams = draft.weight_grams;
        self.touch();
        Ok(())
    }

    pub fn is_available(&self) -> bool { self.status == ProductStatus::Active }

    pub fn archive(&mut self) { self.status = ProductStatus::Archived; self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Lower-case, ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProductError {
    #[error("name is required")]
    MissingName,
    #[error("price must be positive")]
    InvalidPrice,
    #[error("weight cannot be negative")]
    InvalidWeight,
    #[error("unknown product status {0:?}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: i64) -> ProductDraft {
        ProductDraft { category_id: Uuid::nil(), name: name.into(), description: None, price: Money::rupiah(price), weight_grams: 500 }
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(draft("  Organic Bananas (1 kg) ", 25_000)).unwrap();
        assert_eq!(p.name, "Organic Bananas (1 kg)");
        assert_eq!(p.slug, "organic-bananas-1-kg");
        assert!(p.is_available());
    }

    #[test]
    fn test_product_rejects_bad_fields() {
        assert_eq!(Product::create(draft(" ", 1)).unwrap_err(), ProductError::MissingName);
        assert_eq!(Product::create(draft("Milk", 0)).unwrap_err(), ProductError::InvalidPrice);
    }

    #[test]
    fn test_archive() {
        let mut p = Product::create(draft("Eggs", 30_000)).unwrap();
        p.archive();
        assert!(!p.is_available());
        assert_eq!("archived".parse::<ProductStatus>().unwrap(), ProductStatus::Archived);
    }
}
