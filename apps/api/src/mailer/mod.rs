//! Confirmation mail sent to applicants after a successful submission.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport (STARTTLS relay with
//! credentials). Missing credentials do not stop the server from starting;
//! each send attempt then fails with [`MailError::NotConfigured`].

use std::fmt::{self, Display};

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

pub const CONFIRMATION_SUBJECT: &str = "Thank you for applying.";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay is not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(
        &self,
        recipient_address: &str,
        recipient_name: &str,
    ) -> Result<(), MailError>;
}

/// Plain-text body of the confirmation mail.
#[derive(Debug)]
pub struct ConfirmationEmail<'a> {
    pub recipient_name: &'a str,
    pub company_name: &'a str,
}

impl Display for ConfirmationEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hello {name},\n\n\
             Thank you for applying to {company}. We have received your application \
             and will review it as soon as possible. If you have any questions or need \
             further assistance, please don't hesitate to contact us.\n\n\
             Best regards,\n\
             The {company} Team",
            name = self.recipient_name,
            company = self.company_name,
        )
    }
}

pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        if config.username.is_none() || config.password.is_none() {
            info!("SMTP credentials not configured; confirmation emails will fail");
        }
        Self { config }
    }

    /// Assembles the confirmation message without sending it.
    pub fn build_confirmation(
        &self,
        recipient_address: &str,
        recipient_name: &str,
    ) -> Result<Message, MailError> {
        let from = self
            .config
            .from_address
            .as_deref()
            .ok_or(MailError::NotConfigured("SMTP_FROM"))?
            .parse::<Address>()?;
        let to = recipient_address.parse::<Address>()?;
        let display_name = Some(recipient_name.to_string()).filter(|n| !n.trim().is_empty());

        let body = ConfirmationEmail {
            recipient_name,
            company_name: &self.config.company_name,
        };

        Message::builder()
            .from(Mailbox::new(None, from))
            .to(Mailbox::new(display_name, to))
            .subject(CONFIRMATION_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation(
        &self,
        recipient_address: &str,
        recipient_name: &str,
    ) -> Result<(), MailError> {
        let user = self
            .config
            .username
            .clone()
            .ok_or(MailError::NotConfigured("SMTP_USERNAME"))?;
        let password = self
            .config
            .password
            .clone()
            .ok_or(MailError::NotConfigured("SMTP_PASSWORD"))?;

        let email = self.build_confirmation(recipient_address, recipient_name)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(user, password))
            .build();
        mailer.send(email).await?;

        info!(to = recipient_address, "Confirmation email sent");
        Ok(())
    }
}
