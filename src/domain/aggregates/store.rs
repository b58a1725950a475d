//! Store (tenant) aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::GeoPoint;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub service_radius_km: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn open(name: impl Into<String>, address: impl Into<String>, location: GeoPoint, service_radius_km: f64) -> Result<Self, StoreError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(StoreError::MissingName); }
        if !(service_radius_km > 0.0) { return Err(StoreError::InvalidRadius(service_radius_km)); }
        Ok(Self { id: Uuid::now_v7(), name, address: address.into(), location, service_radius_km, is_active: true, created_at: Utc::now() })
    }

    pub fn serves(&self, point: &GeoPoint) -> bool {
        self.is_active && self.location.distance_km(point) <= self.service_radius_km
    }
}

/// Closest active store whose service radius covers `point`, with its distance.
pub fn nearest_store<'a>(point: &GeoPoint, stores: &'a [Store]) -> Option<(&'a Store, f64)> {
    stores
        .iter()
        .filter(|s| s.serves(point))
        .map(|s| (s, s.location.distance_km(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store name is required")]
    MissingName,
    #[error("service radius must be positive, got {0}")]
    InvalidRadius(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str, lat: f64, lon: f64, radius: f64) -> Store {
        Store::open(name, "-", GeoPoint::new(lat, lon).unwrap(), radius).unwrap()
    }

    #[test]
    fn test_nearest_store_picks_closest_in_radius() {
        let stores = vec![
            store("Kemang", -6.2607, 106.8137, 10.0),
            store("Menteng", -6.1957, 106.8310, 10.0),
            store("Bandung", -6.9175, 107.6191, 50.0),
        ];
        let here = GeoPoint::new(-6.2000, 106.8300).unwrap();
        let (s, d) = nearest_store(&here, &stores).unwrap();
        assert_eq!(s.name, "Menteng");
        assert!(d < 1.0);
    }

    #[test]
    fn test_no_store_out_of_range() {
        let mut stores = vec![store("Kemang", -6.2607, 106.8137, 5.0)];
        let surabaya = GeoPoint::new(-7.2575, 112.7521).unwrap();
        assert!(nearest_store(&surabaya, &stores).is_none());
        stores[0].is_active = false;
        assert!(nearest_store(&stores[0].location.clone(), &stores).is_none());
    }

    #[test]
    fn test_open_validates() {
        let p = GeoPoint::new(0.0, 0.0).unwrap();
        assert_eq!(Store::open("", "-", p, 1.0).unwrap_err(), StoreError::MissingName);
        assert!(matches!(Store::open("A", "-", p, 0.0), Err(StoreError::InvalidRadius(_))));
    }
}
