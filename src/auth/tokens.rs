use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::state::AppState;

/// Token type. Each kind is signed with an independent secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Activation,
    Session,
    Reset,
}

/// Registration fields carried inside an activation token until the account
/// is materialized. The password is hashed before issuance; plaintext never
/// enters a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivationClaims {
    #[serde(flatten)]
    pub registration: PendingRegistration,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub name: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies the three token kinds.
pub struct TokenKeys {
    activation: KeyPair,
    session: KeyPair,
    reset: KeyPair,
    issuer: String,
    audience: String,
    activation_ttl: Duration,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.tokens)
    }
}

impl TokenKeys {
    pub fn from_config(cfg: &TokenConfig) -> Self {
        Self {
            activation: KeyPair::from_secret(&cfg.activation_secret),
            session: KeyPair::from_secret(&cfg.session_secret),
            reset: KeyPair::from_secret(&cfg.reset_secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            activation_ttl: Duration::from_secs((cfg.activation_ttl_minutes as u64) * 60),
            session_ttl: Duration::from_secs((cfg.session_ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((cfg.reset_ttl_minutes as u64) * 60),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Activation => &self.activation,
            TokenKind::Session => &self.session,
            TokenKind::Reset => &self.reset,
        }
    }

    fn window(&self, kind: TokenKind) -> (usize, usize) {
        let ttl = match kind {
            TokenKind::Activation => self.activation_ttl,
            TokenKind::Session => self.session_ttl,
            TokenKind::Reset => self.reset_ttl,
        };
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    fn sign<T: Serialize>(&self, kind: TokenKind, claims: &T) -> anyhow::Result<String> {
        let token = encode(&Header::default(), claims, &self.keys(kind).encoding)?;
        debug!(kind = ?kind, "token signed");
        Ok(token)
    }

    fn verify<T: DeserializeOwned>(&self, kind: TokenKind, token: &str) -> anyhow::Result<T> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<T>(token, &self.keys(kind).decoding, &validation)?;
        debug!(kind = ?kind, "token verified");
        Ok(data.claims)
    }

    pub fn sign_activation(&self, registration: PendingRegistration) -> anyhow::Result<String> {
        let (iat, exp) = self.window(TokenKind::Activation);
        let claims = ActivationClaims {
            registration,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        self.sign(TokenKind::Activation, &claims)
    }

    pub fn verify_activation(&self, token: &str) -> anyhow::Result<ActivationClaims> {
        self.verify(TokenKind::Activation, token)
    }

    pub fn sign_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        let (iat, exp) = self.window(TokenKind::Session);
        let claims = SessionClaims {
            sub: user_id,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        self.sign(TokenKind::Session, &claims)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<SessionClaims> {
        self.verify(TokenKind::Session, token)
    }

    pub fn sign_reset(&self, name: &str, email: &str) -> anyhow::Result<String> {
        let (iat, exp) = self.window(TokenKind::Reset);
        let claims = ResetClaims {
            name: name.to_string(),
            email: email.to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        self.sign(TokenKind::Reset, &claims)
    }

    pub fn verify_reset(&self, token: &str) -> anyhow::Result<ResetClaims> {
        self.verify(TokenKind::Reset, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;

    fn test_config() -> TokenConfig {
        TokenConfig {
            session_secret: "session-secret".into(),
            activation_secret: "activation-secret".into(),
            reset_secret: "reset-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            session_ttl_minutes: 60 * 24 * 7,
            activation_ttl_minutes: 45,
            reset_ttl_minutes: 45,
        }
    }

    fn make_keys() -> TokenKeys {
        TokenKeys::from_config(&test_config())
    }

    fn pending() -> PendingRegistration {
        PendingRegistration {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            categories: vec!["tech".into(), "travel".into()],
        }
    }

    #[test]
    fn activation_roundtrip_preserves_payload() {
        let keys = make_keys();
        let token = keys.sign_activation(pending()).expect("sign activation");
        let claims = keys.verify_activation(&token).expect("verify activation");
        assert_eq!(claims.registration, pending());
        assert_eq!(claims.iss, "test-issuer");
    }

    #[test]
    fn session_roundtrip_carries_user_id() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_session(user_id).expect("sign session");
        let claims = keys.verify_session(&token).expect("verify session");
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn reset_roundtrip_carries_email() {
        let keys = make_keys();
        let token = keys
            .sign_reset("Jane Doe", "jane@example.com")
            .expect("sign reset");
        let claims = keys.verify_reset(&token).expect("verify reset");
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.name, "Jane Doe");
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            iat: (now - 8 * 24 * 3600) as usize,
            exp: (now - 3600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"session-secret"),
        )
        .unwrap();
        assert!(keys.verify_session(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = make_keys();
        let token = keys.sign_session(Uuid::new_v4()).expect("sign session");
        let mut tampered = token.into_bytes();
        // Flip a character inside the signature segment.
        let idx = tampered.len() - 10;
        tampered[idx] = if tampered[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(keys.verify_session(&tampered).is_err());
    }

    #[test]
    fn kinds_do_not_share_secrets() {
        let keys = make_keys();
        // A reset token shaped like a reset claim but signed with the session
        // secret must not verify as a reset token.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = ResetClaims {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            iat: now as usize,
            exp: (now + 600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"session-secret"),
        )
        .unwrap();
        assert!(keys.verify_reset(&forged).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let keys = make_keys();
        let mut other_cfg = test_config();
        other_cfg.issuer = "other-issuer".into();
        let other = TokenKeys::from_config(&other_cfg);
        let token = other.sign_session(Uuid::new_v4()).expect("sign session");
        assert!(keys.verify_session(&token).is_err());
    }
}
