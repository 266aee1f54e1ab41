use chrono::Utc;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, User, UserRow};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. Fails with [`DatabaseError::Duplicate`] if the name is taken.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (name, created_at) VALUES (?, ?) RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(to_millis(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.into_user())
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, created_at FROM users WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// All users in registration order.
    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, name, created_at FROM users ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Delete every user. Their follows go with them; feeds they added stay
    /// with no owner. Returns the number of users removed.
    pub async fn delete_all_users(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
