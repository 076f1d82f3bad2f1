use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub categories: Vec<String>,
}

/// Request body for completing registration from an emailed link.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for requesting a password-reset email.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for setting a new password from an emailed link.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Informational response for flows that continue over email.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_role_without_hash() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            username: "janedoe".into(),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            role: Role::Admin,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
        assert!(!json.contains("password"));
    }

    #[test]
    fn reset_request_accepts_camel_case() {
        let req: ResetPasswordRequest =
            serde_json::from_str(r#"{"token":"t","newPassword":"hunter22"}"#).unwrap();
        assert_eq!(req.new_password, "hunter22");
    }
}
