use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors raised while building or handing off an email.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("delivery failed: {0}")]
    Transport(String),
}

/// A rendered outbound email. All four parts are required; construction
/// fails naming the missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

impl EmailMessage {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
    ) -> Result<Self, MailError> {
        let subject = subject.into();
        let body = body.into();
        let from = from.into();

        if subject.is_empty() {
            return Err(MailError::EmptyField("Subject"));
        }
        if body.is_empty() {
            return Err(MailError::EmptyField("Message"));
        }
        if from.is_empty() {
            return Err(MailError::EmptyField("Sender"));
        }
        if to.is_empty() || to.iter().any(String::is_empty) {
            return Err(MailError::EmptyField("Recipients"));
        }

        Ok(Self {
            subject,
            body,
            from,
            to,
        })
    }
}

/// Outbound mail transport seam. Delivery is best-effort: callers log
/// and swallow failures rather than propagating them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Default transport: records deliveries in the application log. The
/// real SMTP hop lives outside this service.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            subject = %message.subject,
            from = %message.from,
            to = ?message.to,
            "email dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_subject() {
        let err = EmailMessage::new("", "body", "a@b.com", vec!["c@d.com".into()]);
        assert_eq!(err.unwrap_err(), MailError::EmptyField("Subject"));
    }

    #[test]
    fn rejects_missing_recipients() {
        let err = EmailMessage::new("s", "body", "a@b.com", vec![]);
        assert_eq!(err.unwrap_err(), MailError::EmptyField("Recipients"));

        let err = EmailMessage::new("s", "body", "a@b.com", vec![String::new()]);
        assert_eq!(err.unwrap_err(), MailError::EmptyField("Recipients"));
    }

    #[test]
    fn builds_complete_message() {
        let msg =
            EmailMessage::new("s", "body", "a@b.com", vec!["c@d.com".into()]).unwrap();
        assert_eq!(msg.to.len(), 1);
    }

    #[tokio::test]
    async fn log_mailer_accepts_messages() {
        let mailer = LogMailer;
        let msg =
            EmailMessage::new("s", "body", "a@b.com", vec!["c@d.com".into()]).unwrap();
        assert!(mailer.deliver(msg).await.is_ok());
    }
}
