use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ActivateRequest, AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            PublicUser, RegisterRequest, ResetPasswordRequest,
        },
        extractors::{AdminUser, CurrentUser},
        password::{hash_password, verify_password},
        repo_types::User,
        tokens::{PendingRegistration, TokenKeys},
    },
    error::AppError,
    mailer::EmailKind,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/register/activate", post(register_activate))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Derive the immutable username from the display name: lowercase, spaces
/// stripped, at most 12 characters.
pub(crate) fn username_from_name(name: &str) -> String {
    let compact: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact.chars().take(12).collect()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Must be a valid email address".into()));
    }
    if payload.name.is_empty() || payload.name.chars().count() > 32 {
        return Err(AppError::Validation("Name is required".into()));
    }
    if payload.password.chars().count() < 6 {
        warn!("password too short");
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }
    if payload.categories.is_empty() {
        return Err(AppError::Validation(
            "Please select at least one category".into(),
        ));
    }

    // Reject before issuing a token when the email is already taken.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(format!(
            "User with {} already exists",
            payload.email
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign_activation(PendingRegistration {
        name: payload.name,
        email: payload.email.clone(),
        password_hash,
        categories: payload.categories,
    })?;

    state
        .mailer
        .send(EmailKind::Activation, &payload.email, &token)
        .await?;

    info!(email = %payload.email, "activation email sent");
    Ok(Json(MessageResponse {
        message: format!(
            "An email has been sent to {}. Follow the instructions to complete your registration!",
            payload.email
        ),
    }))
}

#[instrument(skip(state, payload))]
pub async fn register_activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let keys = TokenKeys::from_ref(&state);
    let claims = keys.verify_activation(&payload.token).map_err(|_| {
        warn!("activation token rejected");
        AppError::InvalidToken
    })?;
    let registration = claims.registration;

    // The email may have been registered between issuance and activation.
    if User::find_by_email(&state.db, &registration.email)
        .await?
        .is_some()
    {
        warn!(email = %registration.email, "email registered since token issuance");
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let username = username_from_name(&registration.name);
    let user = User::create(
        &state.db,
        &username,
        &registration.name,
        &registration.email,
        &registration.password_hash,
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user activated");
    Ok(Json(MessageResponse {
        message: "Registration success! Please log in.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Must be a valid email address".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            AppError::NotFound("User with that email does not exist. Please register!".into())
        })?;

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(
            "Email and password do not match".into(),
        ));
    }

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation("Must be a valid email address".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "forgot-password unknown email");
            AppError::NotFound("The email does not exist".into())
        })?;

    let keys = TokenKeys::from_ref(&state);
    let token = keys.sign_reset(&user.name, &user.email)?;

    state
        .mailer
        .send(EmailKind::Reset, &user.email, &token)
        .await?;

    info!(user_id = %user.id, "reset email sent");
    Ok(Json(MessageResponse {
        message: format!(
            "An email has been sent to {}. Follow the instructions to reset your password!",
            user.email
        ),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.new_password.chars().count() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let keys = TokenKeys::from_ref(&state);
    let claims = keys.verify_reset(&payload.token).map_err(|_| {
        warn!("reset token rejected");
        AppError::InvalidToken
    })?;

    let password_hash = hash_password(&payload.new_password)?;
    let user = User::update_password_by_email(&state.db, &claims.email, &password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound("The email does not exist".into()))?;

    // Existing session tokens stay valid until they expire on their own.
    info!(user_id = %user.id, "password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully!".into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = User::list(&state.db, 100, 0).await?;
    info!(admin_id = %admin.id, count = users.len(), "admin listed users");
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.io"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn username_is_lowercased_and_compacted() {
        assert_eq!(username_from_name("Jane Doe"), "janedoe");
        assert_eq!(username_from_name("  Bob  "), "bob");
    }

    #[test]
    fn username_is_truncated_to_twelve_chars() {
        let derived = username_from_name("Maximilian Overlong-Name");
        assert_eq!(derived.chars().count(), 12);
        assert_eq!(derived, "maximilianov");
    }
}
