use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use minimart_core::domain::user::{NewUser, User, UserId};

use super::{conflict_on_unique, parse_timestamp, StoreError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let email = user.normalized_email();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid("email must contain `@`".to_string()));
        }
        if user.name.trim().is_empty() {
            return Err(StoreError::Invalid("name must not be empty".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_active, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.name.trim())
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| conflict_on_unique(error, "email is already registered"))?;

        let id = UserId(result.last_insert_rowid());
        self.find_by_id(id).await?.ok_or(StoreError::NotFound("user"))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, is_active, created_at
             FROM users
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, is_active, created_at
             FROM users
             WHERE email = ?",
        )
        .bind(email.trim().to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }

        Ok(())
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
