//! Accounts and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::Code;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Customer,
    StoreAdmin { store_id: Uuid },
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Customer => "customer", Self::StoreAdmin { .. } => "store_admin", Self::SuperAdmin => "super_admin" }
    }

    pub fn store_id(&self) -> Option<Uuid> {
        match self { Self::StoreAdmin { store_id } => Some(*store_id), _ => None }
    }

    pub fn from_parts(role: &str, store_id: Option<Uuid>) -> Result<Self, UserError> {
        match (role, store_id) {
            ("customer", _) => Ok(Self::Customer),
            ("super_admin", _) => Ok(Self::SuperAdmin),
            ("store_admin", Some(store_id)) => Ok(Self::StoreAdmin { store_id }),
            ("store_admin", None) => Err(UserError::MissingStore),
            (other, _) => Err(UserError::UnknownRole(other.to_string())),
        }
    }

    /// Whether this role may manage `store_id` (stock, discounts, its orders).
    pub fn manages(&self, store_id: Uuid) -> bool {
        match self {
            Self::SuperAdmin => true,
            Self::StoreAdmin { store_id: own } => *own == store_id,
            Self::Customer => false,
        }
    }

    pub fn is_admin(&self) -> bool { !matches!(self, Self::Customer) }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub referral_code: Code,
    pub referred_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(email: impl Into<String>, name: impl Into<String>, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into().trim().to_lowercase(),
            name: name.into().trim().to_string(),
            password_hash,
            role,
            referral_code: Code::generate(""),
            referred_by: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UserError {
    #[error("unknown role {0:?}")]
    UnknownRole(String),
    #[error("store admins must belong to a store")]
    MissingStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_management_scope() {
        let store = Uuid::new_v4();
        assert!(Role::SuperAdmin.manages(store));
        assert!(Role::StoreAdmin { store_id: store }.manages(store));
        assert!(!Role::StoreAdmin { store_id: Uuid::new_v4() }.manages(store));
        assert!(!Role::Customer.manages(store));
    }

    #[test]
    fn test_role_parts_round_trip() {
        let store = Uuid::new_v4();
        let role = Role::StoreAdmin { store_id: store };
        assert_eq!(Role::from_parts(role.as_str(), role.store_id()).unwrap(), role);
        assert_eq!(Role::from_parts("store_admin", None).unwrap_err(), UserError::MissingStore);
    }

    #[test]
    fn test_register_normalizes_email() {
        let u = User::register(" Ani@Example.COM ", "Ani", "hash".into(), Role::Customer);
        assert_eq!(u.email, "ani@example.com");
        assert_eq!(u.referral_code.as_str().len(), 8);
    }
}
