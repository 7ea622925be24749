use crate::config::EmailConfig;
use crate::report::Report;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
enum TransportError {
    #[error("Invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers reports over an authenticated STARTTLS SMTP connection.
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Self {
        Mailer {
            config: config.clone(),
        }
    }

    /// Blocks until the server accepts or rejects the message. Every failure
    /// is logged and reported as `false`.
    #[must_use]
    pub fn send(&self, report: &Report) -> bool {
        match self.try_send(report) {
            Ok(()) => {
                info!(
                    to = %self.config.to_email,
                    subject = %report.subject,
                    "email sent"
                );
                true
            }
            Err(e) => {
                error!(
                    server = %self.config.smtp_server,
                    port = self.config.smtp_port,
                    error = %e,
                    "failed to send email"
                );
                false
            }
        }
    }

    fn try_send(&self, report: &Report) -> Result<(), TransportError> {
        let email = Message::builder()
            .from(parse_mailbox(&self.config.from_email)?)
            .to(parse_mailbox(&self.config.to_email)?)
            .subject(report.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(report.body.clone())?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let mut builder = SmtpTransport::starttls_relay(&self.config.smtp_server)?
            .port(self.config.smtp_port)
            .credentials(creds);
        // Without an explicit value lettre keeps its own socket timeout.
        if let Some(secs) = self.config.timeout_secs {
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }
        let mailer = builder.build();

        mailer.send(&email)?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address.parse().map_err(|source| TransportError::Address {
        address: address.to_string(),
        source,
    })
}
