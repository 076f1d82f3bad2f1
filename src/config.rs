use serde::Deserialize;

/// Signing material for the three token kinds. Each kind has its own secret
/// so a leaked secret for one kind cannot forge tokens of another.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub session_secret: String,
    pub activation_secret: String,
    pub reset_secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub activation_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    /// Frontend origin used when composing activation/reset links.
    pub client_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let tokens = TokenConfig {
            session_secret: std::env::var("JWT_SECRET")?,
            activation_secret: std::env::var("JWT_ACCOUNT_ACTIVATION")?,
            reset_secret: std::env::var("JWT_RESET_PASSWORD")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "inkstream".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "inkstream-users".into()),
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
            activation_ttl_minutes: std::env::var("ACTIVATION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(45),
            reset_ttl_minutes: std::env::var("RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(45),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST")?,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME")?,
            smtp_password: std::env::var("SMTP_PASSWORD")?,
            from_address: std::env::var("EMAIL_FROM")?,
            client_url: std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        Ok(Self {
            database_url,
            tokens,
            mail,
        })
    }
}
