//! SQLite-backed user store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteRow, SqliteSynchronous},
    Row,
};
use tracing::{debug, info};

use super::{StoreError, User, UserStore};
use crate::sync::UserFields;

/// Create a SqlitePool with WAL mode, creating the database file if needed.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StoreError::Internal(format!("Invalid database URL: {e}")))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    debug!("database_pool_created");
    Ok(pool)
}

/// Create the `users` table if it does not exist.
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            email TEXT,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            phone TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("database_migrated");
    Ok(())
}

/// `UserStore` over a SQLite pool.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a mirrored user by external id.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, email, first_name, last_name, phone, created_at, updated_at
            FROM users
            WHERE external_id = ?
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Number of mirrored users.
    pub async fn count_users(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    #[tracing::instrument(skip(self, user), fields(external_id = %user.external_id))]
    async fn create_user(&self, user: &UserFields) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (external_id, email, first_name, last_name, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.external_id)
        .bind(user.email.as_deref())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.phone.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateKey(user.external_id.clone())
            }
            _ => StoreError::Database(e),
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self, user), fields(external_id = %user.external_id))]
    async fn update_user(&self, user: &UserFields) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, first_name = ?, last_name = ?, phone = ?, updated_at = ?
            WHERE external_id = ?
            "#,
        )
        .bind(user.email.as_deref())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.phone.as_deref())
        .bind(Utc::now().to_rfc3339())
        .bind(&user.external_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(user.external_id.clone()));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, external_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(external_id.to_string()));
        }

        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
    })
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Internal(format!("Invalid timestamp {raw:?}: {e}")))
}

/// Single-connection in-memory pool with the schema applied.
#[cfg(test)]
pub(crate) async fn create_test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
