use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Insert a new user with the default role. The unique indexes on email
    /// and username resolve concurrent registrations: one insert wins, the
    /// other surfaces a unique violation.
    pub async fn create(
        db: &PgPool,
        username: &str,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Overwrite the stored password hash for the user with this email.
    /// Returns None when no such user exists.
    pub async fn update_password_by_email(
        db: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE email = $1
            RETURNING id, username, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, name, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }
}
