//! Email service for account verification, password reset and welcome mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.
//! Without SMTP settings the [`Mailer`] logs each message instead, which
//! keeps local development free of a mail server.

use std::future::Future;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for the verification email.
#[derive(Template)]
#[template(path = "email/verification.html")]
struct VerificationEmailHtml<'a> {
    name: &'a str,
    link: &'a str,
}

/// Plain text template for the verification email.
#[derive(Template)]
#[template(path = "email/verification.txt")]
struct VerificationEmailText<'a> {
    name: &'a str,
    link: &'a str,
}

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    link: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    link: &'a str,
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    dashboard_url: &'a str,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    dashboard_url: &'a str,
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

/// What kind of mail to send, with the values its template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailKind {
    Verification { name: String, link: String },
    PasswordReset { name: String, link: String },
    Welcome { name: String, dashboard_url: String },
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub kind: EmailKind,
}

impl EmailMessage {
    #[must_use]
    pub fn subject(&self) -> &'static str {
        match self.kind {
            EmailKind::Verification { .. } => "Verify your Rounds account",
            EmailKind::PasswordReset { .. } => "Reset your Rounds password",
            EmailKind::Welcome { .. } => "Welcome to Rounds",
        }
    }

    /// Render the plain text and HTML bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    pub fn render(&self) -> Result<(String, String), EmailError> {
        let bodies = match &self.kind {
            EmailKind::Verification { name, link } => (
                VerificationEmailText { name, link }.render()?,
                VerificationEmailHtml { name, link }.render()?,
            ),
            EmailKind::PasswordReset { name, link } => (
                PasswordResetEmailText { name, link }.render()?,
                PasswordResetEmailHtml { name, link }.render()?,
            ),
            EmailKind::Welcome {
                name,
                dashboard_url,
            } => (
                WelcomeEmailText {
                    name,
                    dashboard_url,
                }
                .render()?,
                WelcomeEmailHtml {
                    name,
                    dashboard_url,
                }
                .render()?,
            ),
        };
        Ok(bodies)
    }
}

/// Anything that can deliver an [`EmailMessage`].
pub trait EmailSender: Send + Sync {
    fn send(&self, message: EmailMessage) -> impl Future<Output = Result<(), EmailError>> + Send;
}

/// SMTP delivery.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
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
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
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
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// The mailer used by the running server.
#[derive(Clone)]
pub enum Mailer {
    Smtp(SmtpMailer),
    /// Writes the text body to the log. Used when SMTP is not configured.
    Log,
}

impl Mailer {
    /// Build the mailer from optional SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if SMTP settings are present but unusable.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::Smtp(SmtpMailer::new(config)?)),
            None => {
                tracing::warn!("SMTP not configured; outgoing email will be logged only");
                Ok(Self::Log)
            }
        }
    }
}

impl EmailSender for Mailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let (text, html) = message.render()?;
        match self {
            Self::Smtp(smtp) => {
                smtp.send_multipart_email(&message.to, message.subject(), text, html)
                    .await
            }
            Self::Log => {
                tracing::info!(
                    to = %message.to,
                    subject = %message.subject(),
                    body = %text,
                    "Email delivery disabled, message logged"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_bodies_contain_link() {
        let message = EmailMessage {
            to: "owner@example.com".into(),
            kind: EmailKind::Verification {
                name: "Nok".into(),
                link: "https://rounds.test/auth/verify?token=abc".into(),
            },
        };
        let (text, html) = message.render().unwrap();
        assert!(text.contains("https://rounds.test/auth/verify?token=abc"));
        assert!(html.contains("https://rounds.test/auth/verify?token=abc"));
        assert!(text.contains("Nok"));
        assert_eq!(message.subject(), "Verify your Rounds account");
    }

    #[test]
    fn test_html_body_escapes_name() {
        let message = EmailMessage {
            to: "owner@example.com".into(),
            kind: EmailKind::Welcome {
                name: "<b>Nok</b>".into(),
                dashboard_url: "https://rounds.test/".into(),
            },
        };
        let (_, html) = message.render().unwrap();
        assert!(!html.contains("<b>Nok</b>"));
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let message = EmailMessage {
            to: "owner@example.com".into(),
            kind: EmailKind::PasswordReset {
                name: "Nok".into(),
                link: "https://rounds.test/auth/reset-password?token=abc".into(),
            },
        };
        assert!(Mailer::Log.send(message).await.is_ok());
    }
}
