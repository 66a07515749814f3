use async_trait::async_trait;
use uuid::Uuid;

use super::model::UserRow;
use super::{PgStore, StoreResult, UserStore};
use crate::models::User;

const USER_COLUMNS: &str = "uid, email, display_name, pwd_hash, photo_url, bio, joined_at, \
    is_admin, suspended, suspension_reason, deleted";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (uid, email, display_name, pwd_hash, photo_url, bio, joined_at,
            is_admin, suspended, suspension_reason, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(user.uid)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.pwd_hash)
        .bind(&user.photo_url)
        .bind(&user.bio)
        .bind(user.joined_at)
        .bind(user.is_admin)
        .bind(user.suspended)
        .bind(&user.suspension_reason)
        .bind(user.deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // /users/{id}
    async fn find_user(&self, uid: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET email = $2, display_name = $3, pwd_hash = $4, photo_url = $5,
            bio = $6, is_admin = $7, suspended = $8, suspension_reason = $9, deleted = $10
            WHERE uid = $1",
        )
        .bind(user.uid)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.pwd_hash)
        .bind(&user.photo_url)
        .bind(&user.bio)
        .bind(user.is_admin)
        .bind(user.suspended)
        .bind(&user.suspension_reason)
        .bind(user.deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted = FALSE
            ORDER BY joined_at DESC
            LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
