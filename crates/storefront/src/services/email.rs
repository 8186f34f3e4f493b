//! Email service for OTP codes, password resets and order notifications.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Messages are
//! rendered into a [`RenderedEmail`] first and handed to a [`Notifier`], so
//! callers never depend on the transport directly.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Sender name shown in the From header.
const SENDER_NAME: &str = "House of Intimacy";

/// HTML template for the registration code email.
#[derive(Template)]
#[template(path = "email/otp_code.html")]
struct OtpCodeEmailHtml<'a> {
    name: &'a str,
    code: &'a str,
    minutes: i64,
}

/// Plain text template for the registration code email.
#[derive(Template)]
#[template(path = "email/otp_code.txt")]
struct OtpCodeEmailText<'a> {
    name: &'a str,
    code: &'a str,
    minutes: i64,
}

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A fully rendered message, ready to send to any recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers rendered emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `email` to a single recipient.
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError>;
}

/// Render the registration code email.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render_otp_code(name: &str, code: &str, minutes: i64) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: "Your House of Intimacy verification code".to_string(),
        text: OtpCodeEmailText {
            name,
            code,
            minutes,
        }
        .render()?,
        html: OtpCodeEmailHtml {
            name,
            code,
            minutes,
        }
        .render()?,
    })
}

/// Render the password reset email.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render_password_reset(name: &str, reset_url: &str) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: "Reset your House of Intimacy password".to_string(),
        text: PasswordResetEmailText { name, reset_url }.render()?,
        html: PasswordResetEmailHtml { name, reset_url }.render()?,
    })
}

/// Email service for sending transactional emails over SMTP.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: format!("{SENDER_NAME} <{}>", config.from_address),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        self.send_multipart_email(to, &email.subject, &email.text, &email.html)
            .await
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
