//! Persistence for mirrored user records.
//!
//! This module provides:
//! - `UserStore`, the keyed-record capability the sync handler writes through
//! - `SqliteUserStore`, the sqlx-backed implementation
//! - `StoreError`, which distinguishes duplicate and missing keys from
//!   other database failures

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::sync::UserFields;

pub use sqlite::{create_pool, migrate, SqliteUserStore};

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user already exists: {0}")]
    DuplicateKey(String),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal: {0}")]
    Internal(String),
}

/// A mirrored user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub external_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed-record store for users, keyed by the provider's external id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `DuplicateKey` if the external id exists.
    async fn create_user(&self, user: &UserFields) -> Result<(), StoreError>;

    /// Overwrite every mapped field of an existing user. Fails with
    /// `NotFound` if the external id is absent.
    async fn update_user(&self, user: &UserFields) -> Result<(), StoreError>;

    /// Remove a user. Fails with `NotFound` if the external id is absent.
    async fn delete_user(&self, external_id: &str) -> Result<(), StoreError>;
}
