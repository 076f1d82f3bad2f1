use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::auth::tokens::TokenKeys;
use crate::error::AppError;
use crate::state::AppState;

/// Require-signin gate: extracts and validates the Bearer session token,
/// yielding the session's user id.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let keys = TokenKeys::from_ref(state);
        let claims = keys.verify_session(token).map_err(|_| {
            warn!("invalid or expired session token");
            AppError::InvalidToken
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Loads the user record behind the session. Fails with NotFound when the
/// session points at a user that no longer exists.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = User::find_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User is not found!".into()))?;
        Ok(CurrentUser(user))
    }
}

/// As [`CurrentUser`], plus an admin-or-root role gate.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;
        Ok(AdminUser(user))
    }
}

pub(crate) fn ensure_admin(user: &User) -> Result<(), AppError> {
    if !user.role.can_administer() {
        warn!(user_id = %user.id, role = ?user.role, "admin resource denied");
        return Err(AppError::Forbidden("Admin resource! Access Denied".into()));
    }
    Ok(())
}
