use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::MailConfig;

/// Which transactional email to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Activation,
    Reset,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, kind: EmailKind, to: &str, token: &str) -> anyhow::Result<()>;
}

/// Transactional mailer backed by an SMTP relay. Built from an explicit
/// config; no process-global client state.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    client_url: String,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .context("smtp relay")?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.smtp_username.clone(),
                cfg.smtp_password.clone(),
            ))
            .build();
        let from = cfg
            .from_address
            .parse::<Mailbox>()
            .context("parse EMAIL_FROM")?;
        Ok(Self {
            transport,
            from,
            client_url: cfg.client_url.clone(),
        })
    }
}

/// Subject and HTML body for a given email kind and token link.
pub(crate) fn compose(kind: EmailKind, client_url: &str, token: &str) -> (String, String) {
    match kind {
        EmailKind::Activation => (
            "Complete your registration".to_string(),
            format!(
                "<h1>Verify your email address</h1>\
                 <p>Please use the following link to complete your registration:</p>\
                 <p><a href=\"{0}/auth/activate/{1}\">{0}/auth/activate/{1}</a></p>\
                 <p>The link expires in 45 minutes.</p>",
                client_url, token
            ),
        ),
        EmailKind::Reset => (
            "Reset your password".to_string(),
            format!(
                "<h1>Password reset requested</h1>\
                 <p>Please use the following link to set a new password:</p>\
                 <p><a href=\"{0}/auth/password/reset/{1}\">{0}/auth/password/reset/{1}</a></p>\
                 <p>The link expires in 45 minutes.</p>",
                client_url, token
            ),
        ),
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, kind: EmailKind, to: &str, token: &str) -> anyhow::Result<()> {
        let (subject, body) = compose(kind, &self.client_url, token);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .context("build email")?;

        self.transport.send(message).await.context("smtp send")?;
        info!(to = %to, kind = ?kind, "email sent");
        Ok(())
    }
}
