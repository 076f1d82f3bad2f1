use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tier of a user. Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Root,
}

impl Role {
    /// Whether this role may access admin-gated resources.
    pub fn can_administer(&self) -> bool {
        matches!(self, Role::Admin | Role::Root)
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_root_can_administer() {
        assert!(!Role::User.can_administer());
        assert!(Role::Admin.can_administer());
        assert!(Role::Root.can_administer());
    }

    #[test]
    fn roles_order_by_capability() {
        assert!(Role::User < Role::Admin);
        assert!(Role::Admin < Role::Root);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Root).unwrap(), "\"root\"");
        let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
