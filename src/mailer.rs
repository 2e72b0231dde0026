//! Outbound Mail
//!
//! Verification messages are handed to a [`Mailer`]. The SMTP implementation
//! uses lettre; without SMTP settings messages are written to the log.

use crate::config::{MailConfig, SmtpConfig};
use crate::error::AuthError;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use url::Url;

/// Mail delivery collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AuthError>;
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

/// Message carrying the code for self-registration and resend
pub fn verification_code_email(code: &str) -> Email {
    Email {
        subject: "Verify your account".to_string(),
        html: format!(
            "<h3>Verify your account</h3>\n<p>Your verification code is: <b>{code}</b></p>\n"
        ),
    }
}

/// Invitation for administratively created accounts
pub fn verification_link_email(
    verify_url: &str,
    code: &str,
    email: &str,
) -> Result<Email, AuthError> {
    let mut link = Url::parse(verify_url)
        .map_err(|e| AuthError::Config(format!("VERIFY_URL is not a valid URL: {e}")))?;
    link.query_pairs_mut()
        .append_pair("token", code)
        .append_pair("email", email);

    Ok(Email {
        subject: "Verify your email".to_string(),
        html: format!(
            "<h2>Welcome!</h2>\n\
             <p>Click the link below to verify your email:</p>\n\
             <p><a href=\"{link}\" style=\"padding: 10px 20px; background-color: #0070f3; \
             color: white; text-decoration: none;\">Verify Email</a></p>\n"
        ),
    })
}

/// Build the mailer described by the configuration
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, AuthError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp, &config.from)?)),
        None => {
            tracing::warn!("SMTP_HOST not set, verification emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

// ============================================
// SMTP
// ============================================

/// SMTP relay mailer (STARTTLS)
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, AuthError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AuthError::Config(format!("EMAIL_FROM is not a valid address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| AuthError::Config(format!("Invalid SMTP relay: {e}")))?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AuthError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body("Please view this email in HTML format.".to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

// ============================================
// Log only
// ============================================

/// Writes messages to the log instead of delivering them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AuthError> {
        tracing::info!(to = %to, subject = %subject, body = %html_body, "Email not delivered (no SMTP configured)");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// A message captured by [`RecordingMailer`]
    #[derive(Debug, Clone)]
    pub struct Sent {
        pub to: String,
        pub subject: String,
        pub html: String,
    }

    /// Records messages; optionally fails every send
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<Sent>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub async fn last(&self) -> Option<Sent> {
            self.sent.lock().await.last().cloned()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), AuthError> {
            if self.fail {
                return Err(AuthError::Delivery("relay unavailable".into()));
            }

            self.sent.lock().await.push(Sent {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html_body.to_string(),
            });
            Ok(())
        }
    }
}
