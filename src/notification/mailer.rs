//! Email transports

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

use super::{EmailMessage, EmailTransport, NotifyError};

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Build a mailer for `host`. TLS is used unless the config asks for a
    /// plain relay.
    pub fn new(config: &SmtpConfig, host: &str) -> Result<Self, NotifyError> {
        let mut builder = if config.insecure {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Delivery(e.to_string()))?
        };

        builder = builder.port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(self.from.clone()))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(message.to.clone()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailTransport for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let email = self.build(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Used when no SMTP host is configured: messages are only logged
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: Some("localhost".to_string()),
            port: 1025,
            username: None,
            password: None,
            from: "Rosebank <no-reply@rosebank.local>".to_string(),
            insecure: true,
        }
    }

    #[tokio::test]
    async fn test_build_message() {
        let mailer = SmtpMailer::new(&config(), "localhost").unwrap();
        let message = EmailMessage {
            to: "client@example.com".to_string(),
            subject: "Welcome".to_string(),
            body: "Hello".to_string(),
        };

        assert!(mailer.build(&message).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let mailer = SmtpMailer::new(&config(), "localhost").unwrap();
        let message = EmailMessage {
            to: "not an address".to_string(),
            subject: "Welcome".to_string(),
            body: "Hello".to_string(),
        };

        assert!(matches!(
            mailer.build(&message),
            Err(NotifyError::InvalidAddress(_))
        ));
    }
}
